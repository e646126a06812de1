//! List registry entries and routes

use anyhow::Result;

use crate::registry::Registry;
use crate::routes::RouteTable;
use crate::view;
use crate::Site;

/// List site content by type
pub fn run(site: &Site, what: &str, json: bool) -> Result<()> {
    let registry = Registry::load(&site.registry_path(), &site.config.blog_prefix)?;

    match what {
        "entries" | "entry" => {
            let items = view::listing(&registry);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("Entries ({}):", items.len());
                for entry in registry.by_listing_order() {
                    println!(
                        "  {} - {} [{}]",
                        entry.date.format("%Y-%m-%d"),
                        entry.title,
                        entry.source
                    );
                }
            }
        }
        "routes" | "route" => {
            let routes = RouteTable::build(&registry)?;
            if json {
                let rows: Vec<_> = routes
                    .iter()
                    .filter_map(|(path, index)| {
                        registry.get(index).map(|entry| {
                            serde_json::json!({
                                "path": path,
                                "source": entry.source,
                            })
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Routes ({}):", routes.len());
                for (path, index) in routes.iter() {
                    if let Some(entry) = registry.get(index) {
                        println!("  {} => {}", path, entry.source);
                    }
                }
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: entries, routes", what);
        }
    }

    Ok(())
}
