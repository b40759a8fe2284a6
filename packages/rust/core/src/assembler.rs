//! Article assembler.
//!
//! Combines the title, generated sections, keywords/tags, analytics references
//! and repository stats into a single Markdown document with YAML frontmatter.
//! Rendering is deterministic for the same inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use devlog_shared::{DevlogError, PublishSettings, RepositoryRecord, Result, TagSet};

use crate::analytics::AnalyticsRefs;
use crate::generator::GeneratedSection;
use crate::reading_time::ReadingTime;

/// Author used when no candidates are configured.
const UNKNOWN_AUTHOR: &str = "unknown";

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cover {
    pub alt: String,
    pub square: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaEntry {
    pub content: String,
    pub name: String,
}

/// YAML header consumed by the publishing platform. Field order is output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<Cover>,
    pub description: String,
    pub featured: bool,
    pub keywords: String,
    pub layout: String,
    pub meta: Vec<MetaEntry>,
    pub pub_date: String,
    pub tags: Vec<String>,
    pub theme: String,
    pub title: String,
}

impl Frontmatter {
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| DevlogError::validation(format!("failed to encode frontmatter: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Repository stats shown at the end of the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFooter {
    pub url: String,
    pub stars: u64,
    pub forks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSection {
    pub heading: String,
    pub body: String,
}

/// A fully assembled article.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub byline: String,
    pub reading_time: ReadingTime,
    pub title: String,
    pub sections: Vec<DocumentSection>,
    pub analytics: AnalyticsRefs,
    pub footer: RepositoryFooter,
}

impl Document {
    /// Render to Markdown in the fixed order: frontmatter, byline, reading
    /// time, title, sections, analytics, footer.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();

        out.push_str("---\n");
        out.push_str(&self.frontmatter.to_yaml()?);
        out.push_str("---\n\n");

        out.push_str(&self.byline);
        out.push_str("\n\n");
        out.push_str(&format!("{} read\n\n", self.reading_time));
        out.push_str(&format!("# {}\n\n", self.title));

        for section in &self.sections {
            out.push_str(&section.heading);
            out.push_str("\n\n");
            out.push_str(&section.body);
            out.push_str("\n\n");
        }

        render_analytics(&mut out, &self.analytics);

        out.push_str(&format!(
            "* Repository URL: [{url}]({url})\n* Stars: **{stars}**\n* Forks: **{forks}**\n",
            url = self.footer.url,
            stars = self.footer.stars,
            forks = self.footer.forks,
        ));

        Ok(out)
    }
}

fn render_analytics(out: &mut String, refs: &AnalyticsRefs) {
    let charts = [
        ("Development Timeline", "Commit Timeline", &refs.timeline),
        ("Commit Activity Heatmap", "Commit Heatmap", &refs.heatmap),
        ("Contributor Network", "Contributor Network", &refs.contributor_network),
        ("Commit Activity Patterns", "Commit Activity", &refs.activity_pattern),
        ("Code Frequency", "Code Frequency", &refs.code_frequency),
    ];

    out.push_str("## Project Development Analytics\n\n");
    for (heading, alt, path) in charts {
        out.push_str(&format!("### {heading}\n\n![{alt}]({path})\n\n"));
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Everything produced for one repository before assembly.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    pub repo: &'a RepositoryRecord,
    pub title: String,
    pub sections: &'a [GeneratedSection],
    pub keywords: &'a [String],
    pub tags: &'a TagSet,
    pub analytics: AnalyticsRefs,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    settings: PublishSettings,
}

impl DocumentAssembler {
    pub fn new(settings: PublishSettings) -> Self {
        Self { settings }
    }

    #[instrument(skip_all, fields(repo = %input.repo.name, sections = input.sections.len()))]
    pub fn assemble(&self, input: AssemblyInput<'_>) -> Document {
        let repo = input.repo;
        let date = input.now.format("%Y-%m-%d").to_string();
        let author = select_author(&self.settings.author_list, &repo.name);
        let keywords = input.keywords.join(", ");

        let sections: Vec<DocumentSection> = input
            .sections
            .iter()
            .map(|s| DocumentSection {
                heading: s.heading.to_string(),
                body: s.body(),
            })
            .collect();

        let prose = sections
            .iter()
            .map(|s| format!("{}\n\n{}", s.heading, s.body))
            .collect::<Vec<_>>()
            .join("\n\n");
        let reading_time = ReadingTime::estimate(&prose, self.settings.words_per_minute);

        let cover = self.settings.cover_image_url.as_ref().map(|url| Cover {
            alt: "cover".into(),
            square: url.clone(),
            url: url.clone(),
        });

        let frontmatter = Frontmatter {
            author: author.clone(),
            cover,
            description: repo.description.clone(),
            featured: self.settings.featured,
            keywords: keywords.clone(),
            layout: self.settings.layout.clone(),
            meta: vec![
                MetaEntry {
                    content: author,
                    name: "author".into(),
                },
                MetaEntry {
                    content: keywords,
                    name: "keywords".into(),
                },
            ],
            pub_date: date.clone(),
            tags: input.tags.iter().cloned().collect(),
            theme: self.settings.theme.clone(),
            title: input.title.clone(),
        };

        debug!(%reading_time, "document assembled");

        Document {
            frontmatter,
            byline: format!("*Built by {} | Last updated: {date}*", self.settings.username),
            reading_time,
            title: input.title,
            sections,
            analytics: input.analytics,
            footer: RepositoryFooter {
                url: repo.html_url.clone(),
                stars: repo.stars,
                forks: repo.forks,
            },
        }
    }
}

/// Deterministic pick from `authors`, keyed by the repository name.
pub fn select_author(authors: &[String], repo_name: &str) -> String {
    if authors.is_empty() {
        return UNKNOWN_AUTHOR.to_string();
    }
    let digest = Sha256::digest(repo_name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let index = (u64::from_be_bytes(prefix) % authors.len() as u64) as usize;
    authors[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FailureReason, GenerationResult};
    use crate::sections::{self, SectionKind};
    use crate::testing::sample_repo;
    use chrono::TimeZone;
    use devlog_shared::{AppConfig, GenerationError};

    fn settings() -> PublishSettings {
        let mut app = AppConfig::default();
        app.defaults.username = "octocat".into();
        app.publishing.author_list = vec!["Ada".into(), "Grace".into(), "Linus".into()];
        app.publishing.cover_image_url = Some("https://cdn.example.com/cover.png".into());
        PublishSettings::from(&app)
    }

    fn generated(fail: Option<SectionKind>) -> Vec<GeneratedSection> {
        sections::plan()
            .into_iter()
            .map(|spec| GeneratedSection {
                kind: spec.kind,
                heading: spec.heading,
                result: if Some(spec.kind) == fail {
                    GenerationResult::Failed(FailureReason::Exhausted {
                        attempts: 3,
                        last_error: GenerationError::Network("down".into()),
                    })
                } else {
                    GenerationResult::Success(format!("Body of {}.", spec.kind))
                },
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 21, 8, 0, 0).unwrap()
    }

    fn render(settings: PublishSettings, fail: Option<SectionKind>) -> String {
        let repo = sample_repo("devlog");
        let sections = generated(fail);
        let keywords = vec!["Rust".to_string(), "CLI".to_string()];
        let tags: TagSet = ["cli".to_string(), "rust".to_string()].into_iter().collect();
        DocumentAssembler::new(settings)
            .assemble(AssemblyInput {
                repo: &repo,
                title: "Building devlog".into(),
                sections: &sections,
                keywords: &keywords,
                tags: &tags,
                analytics: AnalyticsRefs {
                    heatmap: "/assets/devlog-commit_heatmap.png".into(),
                    ..Default::default()
                },
                now: now(),
            })
            .render()
            .unwrap()
    }

    #[test]
    fn renders_in_fixed_order() {
        let md = render(settings(), None);
        let positions: Vec<usize> = [
            "---\nauthor:",
            "*Built by octocat | Last updated: 2024-12-21*",
            "10 seconds read",
            "# Building devlog",
            "## Project Genesis",
            "## From Idea to Implementation",
            "## Under the Hood",
            "## Lessons from the Trenches",
            "## What's Next?",
            "## Project Development Analytics",
            "* Repository URL: [https://github.com/octocat/devlog](https://github.com/octocat/devlog)",
        ]
        .iter()
        .map(|needle| md.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{md}");
        assert!(md.contains("* Stars: **12**"));
        assert!(md.contains("* Forks: **3**"));
    }

    #[test]
    fn reading_time_counts_headings() {
        // 15 body words plus 20 heading tokens at 200 wpm.
        let md = render(settings(), None);
        assert!(md.contains("\n10 seconds read\n"), "{md}");
    }

    #[test]
    fn frontmatter_fields() {
        let md = render(settings(), None);
        let yaml = md.split("---\n").nth(1).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(value["keywords"], "Rust, CLI");
        assert_eq!(value["pubDate"], "2024-12-21");
        assert_eq!(value["theme"], "light");
        assert_eq!(value["layout"], "../../layouts/MarkdownPost.astro");
        assert_eq!(value["featured"], true);
        assert_eq!(value["cover"]["alt"], "cover");
        assert_eq!(value["meta"][1]["name"], "keywords");
        assert_eq!(value["tags"][0], "cli");
        assert_eq!(value["title"], "Building devlog");
    }

    #[test]
    fn cover_omitted_without_url() {
        let mut s = settings();
        s.cover_image_url = None;
        let md = render(s, None);
        assert!(!md.contains("cover:"));
    }

    #[test]
    fn failed_section_keeps_heading_with_placeholder() {
        let md = render(settings(), Some(SectionKind::Technical));
        assert!(md.contains(
            "## Under the Hood\n\n[Failed to generate content for technical after 3 attempts]"
        ));
        assert!(md.contains("## Lessons from the Trenches\n\nBody of lessons."));
    }

    #[test]
    fn analytics_block_emitted_with_empty_paths() {
        let md = render(settings(), None);
        assert!(md.contains("![Commit Heatmap](/assets/devlog-commit_heatmap.png)"));
        assert!(md.contains("![Commit Timeline]()"));
        assert!(md.contains("![Code Frequency]()"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render(settings(), None), render(settings(), None));
    }

    #[test]
    fn author_selection_is_stable() {
        let authors = vec!["Ada".to_string(), "Grace".to_string()];
        let first = select_author(&authors, "devlog");
        assert_eq!(select_author(&authors, "devlog"), first);
        assert!(authors.contains(&first));
        assert_eq!(select_author(&[], "devlog"), "unknown");
    }
}
