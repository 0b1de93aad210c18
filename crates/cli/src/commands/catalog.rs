//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! loom catalog materials --search denim
//! loom catalog material raw-denim
//! loom catalog designs --page 2
//! loom catalog design paisley-block-print
//! ```

use super::CliError;

/// List material listings.
pub async fn materials(search: Option<&str>, page: Option<u32>) -> Result<(), CliError> {
    let ctx = super::context().await?;
    let listings = ctx.api.get_materials(search, page).await?;

    tracing::info!("{} materials", listings.count);
    for material in &listings.results {
        tracing::info!(
            "  {} [{}] {} per {} ({})",
            material.slug,
            material.fabric_type,
            material.price_per_unit,
            material.unit_of_measurement,
            material.seller_username.as_deref().unwrap_or("unknown seller"),
        );
    }
    if listings.next.is_some() {
        tracing::info!("More results: --page {}", page.unwrap_or(1) + 1);
    }
    Ok(())
}

/// Show one material.
pub async fn material(slug: &str) -> Result<(), CliError> {
    let ctx = super::context().await?;
    let material = ctx.api.get_material(slug).await?;
    tracing::info!("{} ({})", material.name, material.slug);
    tracing::info!("  Fabric: {}", material.fabric_type);
    tracing::info!(
        "  Price: {} per {}",
        material.price_per_unit,
        material.unit_of_measurement
    );
    if let Some(seller) = &material.seller_username {
        tracing::info!("  Seller: {seller}");
    }
    Ok(())
}

/// List design listings.
pub async fn designs(search: Option<&str>, page: Option<u32>) -> Result<(), CliError> {
    let ctx = super::context().await?;
    let listings = ctx.api.get_designs(search, page).await?;

    tracing::info!("{} designs", listings.count);
    for design in &listings.results {
        tracing::info!(
            "  {} {} ({})",
            design.slug,
            design.price,
            design.designer_username.as_deref().unwrap_or("unknown designer"),
        );
    }
    if listings.next.is_some() {
        tracing::info!("More results: --page {}", page.unwrap_or(1) + 1);
    }
    Ok(())
}

/// Show one design.
pub async fn design(slug: &str) -> Result<(), CliError> {
    let ctx = super::context().await?;
    let design = ctx.api.get_design(slug).await?;
    tracing::info!("{} ({})", design.title, design.slug);
    tracing::info!("  Price: {}", design.price);
    if !design.licensing_options.is_empty() {
        tracing::info!("  Licensing: {}", design.licensing_options);
    }
    if let Some(designer) = &design.designer_username {
        tracing::info!("  Designer: {designer}");
    }
    Ok(())
}
