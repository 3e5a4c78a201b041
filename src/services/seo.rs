//! Search-engine metadata, sitemap and robots.txt

use crate::config::SiteConfig;
use crate::models::{BlogPost, PracticeArea};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public pages that always appear in the sitemap
pub const STATIC_PATHS: &[&str] = &["/", "/about", "/services", "/blog", "/contact", "/fee-calculator"];

/// Head metadata for one public page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub og_type: String,
    pub og_image: Option<String>,
}

impl PageMeta {
    pub fn home(site: &SiteConfig) -> Self {
        Self {
            title: site.name.clone(),
            description: site.description.clone(),
            canonical_url: site.url_for("/"),
            og_type: "website".to_string(),
            og_image: site.default_image.clone(),
        }
    }

    /// SEO overrides fall back to the post title and excerpt
    pub fn for_post(site: &SiteConfig, post: &BlogPost) -> Self {
        let title = post.seo_title.as_deref().unwrap_or(&post.title);
        Self {
            title: format!("{} | {}", title, site.name),
            description: post
                .seo_description
                .clone()
                .unwrap_or_else(|| post.excerpt.clone()),
            canonical_url: site.url_for(&format!("/blog/{}", post.slug)),
            og_type: "article".to_string(),
            og_image: post.cover_image.clone().or_else(|| site.default_image.clone()),
        }
    }

    pub fn for_practice_area(site: &SiteConfig, area: &PracticeArea) -> Self {
        Self {
            title: format!("{} | {}", area.title, site.name),
            description: area.summary.clone(),
            canonical_url: site.url_for(&format!("/services/{}", area.slug)),
            og_type: "website".to_string(),
            og_image: site.default_image.clone(),
        }
    }
}

/// Render `sitemap.xml` for the fixed pages, the given practice areas and
/// the given posts. Callers pass only active areas and published posts.
pub fn sitemap_xml(site: &SiteConfig, areas: &[PracticeArea], posts: &[BlogPost]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    for path in STATIC_PATHS {
        push_url(&mut out, &site.url_for(path), None);
    }
    for area in areas {
        push_url(
            &mut out,
            &site.url_for(&format!("/services/{}", area.slug)),
            Some(area.updated_at),
        );
    }
    for post in posts {
        push_url(
            &mut out,
            &site.url_for(&format!("/blog/{}", post.slug)),
            Some(post.updated_at),
        );
    }

    out.push_str("</urlset>\n");
    out
}

fn push_url(out: &mut String, loc: &str, lastmod: Option<DateTime<Utc>>) {
    out.push_str("  <url>\n");
    out.push_str(&format!("    <loc>{}</loc>\n", xml_escape(loc)));
    if let Some(lastmod) = lastmod {
        out.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }
    out.push_str("  </url>\n");
}

pub fn robots_txt(site: &SiteConfig) -> String {
    format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}\n",
        site.url_for("/sitemap.xml")
    )
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostStatus;
    use chrono::TimeZone;

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Silva & Co".into(),
            base_url: "https://silva.example/".into(),
            description: "Labor and family law".into(),
            default_image: Some("https://silva.example/og.png".into()),
        }
    }

    fn post() -> BlogPost {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        BlogPost {
            id: 1,
            slug: "q&a-on-leases".into(),
            title: "Q&A on leases".into(),
            excerpt: "What tenants ask most.".into(),
            content: String::new(),
            content_html: String::new(),
            cover_image: None,
            category: None,
            tags: vec![],
            author_id: None,
            status: PostStatus::Published,
            seo_title: None,
            seo_description: Some("Lease questions answered".into()),
            reading_minutes: 1,
            view_count: 0,
            published_at: Some(date),
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn test_post_meta_fallbacks() {
        let meta = PageMeta::for_post(&site(), &post());
        assert_eq!(meta.title, "Q&A on leases | Silva & Co");
        assert_eq!(meta.description, "Lease questions answered");
        assert_eq!(meta.canonical_url, "https://silva.example/blog/q&a-on-leases");
        assert_eq!(meta.og_type, "article");
        assert_eq!(meta.og_image.as_deref(), Some("https://silva.example/og.png"));
    }

    #[test]
    fn test_home_meta() {
        let meta = PageMeta::home(&site());
        assert_eq!(meta.canonical_url, "https://silva.example/");
        assert_eq!(meta.title, "Silva & Co");
    }

    #[test]
    fn test_sitemap_escapes_and_dates() {
        let xml = sitemap_xml(&site(), &[], &[post()]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://silva.example/fee-calculator</loc>"));
        assert!(xml.contains("<loc>https://silva.example/blog/q&amp;a-on-leases</loc>"));
        assert!(xml.contains("<lastmod>2024-03-05</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), STATIC_PATHS.len() + 1);
    }

    #[test]
    fn test_robots_points_at_sitemap() {
        let robots = robots_txt(&site());
        assert!(robots.contains("Allow: /"));
        assert!(robots.ends_with("Sitemap: https://silva.example/sitemap.xml\n"));
    }
}
