//! Check the registry and its content sources

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::fetch::ContentFetcher;
use crate::registry::Registry;
use crate::routes::RouteTable;
use crate::Site;

/// What a check found
pub struct Report {
    pub entries: usize,
    /// Entries whose content cannot be fetched
    pub problems: Vec<String>,
    /// Markdown files in the content directory no entry references
    pub orphans: Vec<String>,
}

/// Validate the registry, route table and content sources. Remote sources
/// are only contacted when `remote` is set.
pub async fn inspect(site: &Site, remote: bool) -> Result<Report> {
    let registry = Registry::load(&site.registry_path(), &site.config.blog_prefix)?;
    // Duplicate paths surface here
    let _routes = RouteTable::build(&registry)?;

    let content_dir = site.content_dir();
    let fetcher = ContentFetcher::new(content_dir.clone());

    let mut problems = Vec::new();
    let mut referenced: HashSet<PathBuf> = HashSet::new();

    if let Some(about) = &site.config.about_source {
        if !ContentFetcher::is_remote(about) {
            if let Some(path) = fetcher.local_path(about) {
                referenced.insert(path);
            }
        }
    }

    for entry in registry.entries() {
        if ContentFetcher::is_remote(&entry.source) {
            if remote {
                if let Err(e) = fetcher.fetch(&entry.source).await {
                    problems.push(format!("{}: {}", entry.title, e));
                }
            }
        } else {
            // Resolve exactly as the fetcher will at serve time
            match fetcher.local_path(&entry.source) {
                Some(path) if path.is_file() => {
                    referenced.insert(path);
                }
                Some(_) => problems.push(format!(
                    "{}: content file not found: {}",
                    entry.title, entry.source
                )),
                None => problems.push(format!(
                    "{}: content source escapes the content directory: {}",
                    entry.title, entry.source
                )),
            }
        }
    }

    let mut orphans = Vec::new();
    if content_dir.exists() {
        for file in WalkDir::new(&content_dir).into_iter().filter_map(|e| e.ok()) {
            if file.file_type().is_file()
                && file.path().extension().map(|ext| ext == "md").unwrap_or(false)
                && !referenced.contains(file.path())
            {
                let shown = file
                    .path()
                    .strip_prefix(&content_dir)
                    .unwrap_or(file.path());
                orphans.push(shown.display().to_string());
            }
        }
    }
    orphans.sort();

    Ok(Report {
        entries: registry.len(),
        problems,
        orphans,
    })
}

/// Run the check command
pub async fn run(site: &Site, remote: bool) -> Result<()> {
    let report = inspect(site, remote).await?;

    println!("Entries: {}", report.entries);

    if !report.orphans.is_empty() {
        println!("Unreferenced content ({}):", report.orphans.len());
        for orphan in &report.orphans {
            println!("  {}", orphan);
        }
    }

    if report.problems.is_empty() {
        println!("✅ All content sources check out");
        Ok(())
    } else {
        println!("Problems ({}):", report.problems.len());
        for problem in &report.problems {
            println!("  ❌ {}", problem);
        }
        anyhow::bail!("{} entries failed the check", report.problems.len());
    }
}
