//! Initialize a new folio site

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.join("config.yml").exists() {
        anyhow::bail!(
            "{} already contains a config.yml, refusing to overwrite",
            target_dir.display()
        );
    }

    // Create directory structure
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("content"))?;
    fs::create_dir_all(target_dir.join("assets"))?;

    // Create default config.yml
    let config_content = r#"# folio configuration

# Site
title: Folio
subtitle: ''
description: ''
author: John Doe
language: en

# URL
url: http://example.com
root: /

# Content
blog_prefix: /blogs
registry_file: blogs.yml
content_dir: content
assets_dir: assets
about_source: about.md

# Rendering
highlight:
  theme: base16-ocean.dark
  line_numbers: false

# Server
server:
  ip: localhost
  port: 4000
"#;

    fs::write(target_dir.join("config.yml"), config_content)?;

    // Create the registry with two sample entries
    let today = chrono::Local::now().date_naive();
    let earlier = today - chrono::Duration::days(3);
    let registry_content = format!(
        r#"# Blog registry: one entry per article. The listing sorts newest first.
- title: Hello World
  date: "{}"
  path: /blogs/hello-world
  summary: A quick tour of what this site can render.
  source: hello-world.md

- title: Writing Markdown
  date: "{}"
  path: /blogs/writing-markdown
  summary: Tables, task lists and strikethrough.
  source: writing-markdown.md
"#,
        today.format("%Y-%m-%d"),
        earlier.format("%Y-%m-%d")
    );

    fs::write(target_dir.join("blogs.yml"), registry_content)?;

    // Sample articles
    let hello_world = r#"# Hello World

Welcome to your new site. This first article walks through the rendering
pipeline end to end.

## Table of Contents

## Code

Tagged code blocks are syntax highlighted:

```python
import asyncio

async def main():
    print("hello")

asyncio.run(main())
```

Untagged blocks stay plain:

```
plain preformatted text
```

## Tables

| Feature    | Status |
| ---------- | ------ |
| Tables     | yes    |
| Highlights | yes    |
| TOC        | yes    |

## Next steps

Add an entry to `blogs.yml`, drop its markdown into `content/`, and the
new article shows up in the listing.
"#;

    let writing_markdown = r#"# Writing Markdown

Everyday GitHub-flavored markdown works out of the box.

- [x] task lists
- [ ] with open items

~~Struck-through~~ text, [links](https://example.com), and footnotes[^1]
render as expected.

[^1]: Like this one.
"#;

    let about = r#"# About

This site is served by folio from a small YAML registry. Replace this
file with your own introduction.
"#;

    fs::write(target_dir.join("content/hello-world.md"), hello_world)?;
    fs::write(
        target_dir.join("content/writing-markdown.md"),
        writing_markdown,
    )?;
    fs::write(target_dir.join("content/about.md"), about)?;

    Ok(())
}
