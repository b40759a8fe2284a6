//! The fixed article outline.

use crate::prompt::PromptTemplate;

/// Output budget for the title call.
pub const TITLE_MAX_TOKENS: u32 = 50;

/// Output budget for body sections.
const SECTION_MAX_TOKENS: u32 = 1024;

/// Output budget for the closing section.
const CONCLUSION_MAX_TOKENS: u32 = 300;

pub const TITLE_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "title",
    r#"
Write one engaging, specific title for a blog post about a developer side project.

Project:
- Name: {name}
- Description: {description}
- README excerpt: {readme_excerpt}

Keep it under 80 characters, focus on building the project, and mention the
main technology where it fits. Reply with the title only.
"#,
);

const INTRODUCTION_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "introduction",
    r#"
Write the opening of a blog post about {name}.

Background from the README:
{readme_excerpt}

Cover what sparked the project, why it mattered personally, the first
obstacles, and a short overview of the solution. First person, warm tone.
"#,
);

const RESEARCH_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "research",
    r#"
Using this README for {name}:
{readme}

Describe the path from idea to code: early research and planning, the
technical decisions made and why, alternatives that were set aside, and the
insights that shaped the result.
"#,
);

const TECHNICAL_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "technical",
    r#"
Read this README for {name}:
{readme}

Write a technical deep dive: architecture, key technologies, notable
implementation details, and hard problems that were solved. Use concrete
examples and wrap code in fenced blocks.
"#,
);

const LESSONS_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "lessons",
    r#"
Based on the history and README of {name}:
{readme}

Share practical lessons: what worked, what you would change next time, and
advice for developers attempting something similar.
"#,
);

const CONCLUSION_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "conclusion",
    r#"
Write a forward-looking conclusion for {name}: where the project stands,
planned next steps, an invitation to contributors, and a closing reflection on
the side project journey.

README:
{readme}
"#,
);

/// Article sections, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Introduction,
    Research,
    Technical,
    Lessons,
    Conclusion,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Research => "research",
            Self::Technical => "technical",
            Self::Lessons => "lessons",
            Self::Conclusion => "conclusion",
        }
    }

    pub fn spec(self) -> SectionSpec {
        let (heading, template, max_tokens) = match self {
            Self::Introduction => ("## Project Genesis", INTRODUCTION_TEMPLATE, SECTION_MAX_TOKENS),
            Self::Research => (
                "## From Idea to Implementation",
                RESEARCH_TEMPLATE,
                SECTION_MAX_TOKENS,
            ),
            Self::Technical => ("## Under the Hood", TECHNICAL_TEMPLATE, SECTION_MAX_TOKENS),
            Self::Lessons => (
                "## Lessons from the Trenches",
                LESSONS_TEMPLATE,
                SECTION_MAX_TOKENS,
            ),
            Self::Conclusion => ("## What's Next?", CONCLUSION_TEMPLATE, CONCLUSION_MAX_TOKENS),
        };
        SectionSpec {
            kind: self,
            heading,
            template,
            max_tokens,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body sections; the conclusion always follows them.
pub const PLANNED_SECTIONS: [SectionKind; 4] = [
    SectionKind::Introduction,
    SectionKind::Research,
    SectionKind::Technical,
    SectionKind::Lessons,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub kind: SectionKind,
    pub heading: &'static str,
    pub template: PromptTemplate,
    pub max_tokens: u32,
}

/// Full outline: planned sections in order, then the conclusion.
pub fn plan() -> Vec<SectionSpec> {
    PLANNED_SECTIONS
        .iter()
        .copied()
        .chain(std::iter::once(SectionKind::Conclusion))
        .map(SectionKind::spec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_order_ends_with_conclusion() {
        let kinds: Vec<_> = plan().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Introduction,
                SectionKind::Research,
                SectionKind::Technical,
                SectionKind::Lessons,
                SectionKind::Conclusion,
            ]
        );
    }

    #[test]
    fn headings_and_budgets() {
        let plan = plan();
        assert_eq!(plan[0].heading, "## Project Genesis");
        assert_eq!(plan[3].heading, "## Lessons from the Trenches");
        assert!(plan[..4].iter().all(|s| s.max_tokens == 1024));
        assert_eq!(plan[4].heading, "## What's Next?");
        assert_eq!(plan[4].max_tokens, 300);
    }

    #[test]
    fn templates_only_use_repository_variables() {
        let known = ["name", "description", "readme", "readme_excerpt"];
        for spec in plan() {
            for p in spec.template.placeholders() {
                assert!(known.contains(&p), "{} uses unknown {p}", spec.kind);
            }
        }
        assert!(TITLE_TEMPLATE.placeholders().contains("readme_excerpt"));
    }
}
