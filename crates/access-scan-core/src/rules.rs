//! Deterministic accessibility and ATS scoring.
//!
//! The [`RuleEngine`] holds two ordered lists of checks: one for
//! document-family artifacts (scored from [`ExtractedContent`]) and one for
//! websites (scored from a [`DomSnapshot`]). Each check is a trait object
//! that reads its input and adjusts a shared [`Scorecard`]. New WCAG checks
//! are added by registering another rule; call sites never change.
//!
//! # Built-in rules
//!
//! | Code | Path | Rule |
//! |------|------|------|
//! | (none) | document | [`AtsKeywordRule`]: resume keyword match → ATS score |
//! | `I01` | document | [`SimulatedOcrRule`]: images get a fixed score |
//! | `A1` | document | [`AltTextHeuristicRule`]: "image" without "alt text" |
//! | `W1` | website | [`PageTitleRule`]: missing or short `<title>` |
//! | `W3` | website | [`ImageAltRule`]: `<img>` without alt attributes |
//! | `W4` | website | [`SingleH1Rule`]: exactly one `<h1>` |
//!
//! Scoring is a pure function of its inputs: no I/O, no clocks, no randomness.

use crate::models::{ArtifactKind, DomSnapshot, ExtractedContent, Finding, Priority, ScoreResult};

/// Keywords a resume is expected to mention, matched case-insensitively.
pub const ATS_KEYWORDS: [&str; 4] = ["experience", "skills", "education", "contact"];

/// Running score and findings while a rule list is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    score: f64,
    ats_score: Option<u8>,
    findings: Vec<Finding>,
}

impl Scorecard {
    pub fn new() -> Self {
        Self {
            score: 100.0,
            ats_score: None,
            findings: Vec::new(),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    pub fn deduct(&mut self, points: f64) {
        self.score -= points;
    }

    pub fn set_ats_score(&mut self, ats: u8) {
        self.ats_score = Some(ats);
    }

    pub fn report(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    fn finish(self, ats_score: Option<u8>) -> ScoreResult {
        ScoreResult {
            accessibility_score: clamp_score(self.score),
            ats_score,
            findings: self.findings,
        }
    }
}

impl Default for Scorecard {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds and clamps a raw score into `0..=100`.
fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Extracted content paired with its kind, with the text lowercased once.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    pub kind: ArtifactKind,
    pub content: &'a ExtractedContent,
    lowered: String,
}

impl<'a> DocumentInput<'a> {
    pub fn new(content: &'a ExtractedContent, kind: ArtifactKind) -> Self {
        Self {
            kind,
            content,
            lowered: content.full_text.to_lowercase(),
        }
    }

    /// Lowercased full text for case-insensitive matching.
    pub fn text(&self) -> &str {
        &self.lowered
    }
}

/// A check over extracted document content.
pub trait DocumentRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;
    fn evaluate(&self, input: &DocumentInput<'_>, card: &mut Scorecard);
}

/// A check over a rendered page's DOM snapshot.
pub trait WebsiteRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;
    fn evaluate(&self, snapshot: &DomSnapshot, card: &mut Scorecard);
}

// ============ Document rules ============

/// Computes the ATS keyword match for resume-like documents.
///
/// `ats = round(matched / total × 100)`, then
/// `score = max(0, score − 5) + ats × 0.1`.
pub struct AtsKeywordRule {
    keywords: Vec<String>,
}

impl AtsKeywordRule {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for AtsKeywordRule {
    fn default() -> Self {
        Self::new(ATS_KEYWORDS)
    }
}

impl DocumentRule for AtsKeywordRule {
    fn name(&self) -> &str {
        "ats-keywords"
    }

    fn evaluate(&self, input: &DocumentInput<'_>, card: &mut Scorecard) {
        if !input.kind.is_document_family() || self.keywords.is_empty() {
            return;
        }
        let matched = self
            .keywords
            .iter()
            .filter(|k| input.text().contains(k.as_str()))
            .count();
        let ats = ((matched as f64 / self.keywords.len() as f64) * 100.0).round() as u8;
        card.set_ats_score(ats);
        card.set_score((card.score() - 5.0).max(0.0) + f64::from(ats) * 0.1);
    }
}

/// Image uploads are not OCR'd; they get a fixed score and a notice.
pub struct SimulatedOcrRule;

impl DocumentRule for SimulatedOcrRule {
    fn name(&self) -> &str {
        "simulated-ocr"
    }

    fn evaluate(&self, input: &DocumentInput<'_>, card: &mut Scorecard) {
        if input.kind != ArtifactKind::Image {
            return;
        }
        card.set_score(85.0);
        card.report(Finding::new(
            "I01",
            "OCR analysis was simulated.",
            Priority::Low,
            "Real-time OCR requires external service integration (future scope).",
        ));
    }
}

/// Naive text heuristic: mentions of images with no mention of alt text.
pub struct AltTextHeuristicRule;

impl DocumentRule for AltTextHeuristicRule {
    fn name(&self) -> &str {
        "alt-text-heuristic"
    }

    fn evaluate(&self, input: &DocumentInput<'_>, card: &mut Scorecard) {
        let text = input.text();
        if text.contains("image") && !text.contains("alt text") {
            card.deduct(5.0);
            card.report(Finding::new(
                "A1",
                "Possible missing Alt Text.",
                Priority::High,
                "Ensure all images have Alt Text.",
            ));
        }
    }
}

// ============ Website rules ============

/// Minimum title length, in characters, before `W1` fires.
const MIN_TITLE_CHARS: usize = 5;

pub struct PageTitleRule;

impl WebsiteRule for PageTitleRule {
    fn name(&self) -> &str {
        "page-title"
    }

    fn evaluate(&self, snapshot: &DomSnapshot, card: &mut Scorecard) {
        let short = snapshot
            .title
            .as_deref()
            .map_or(true, |t| t.chars().count() < MIN_TITLE_CHARS);
        if short {
            card.deduct(10.0);
            card.report(Finding::new(
                "W1",
                "Missing or very short page title.",
                Priority::High,
                "Add a descriptive <title> tag.",
            ));
        }
    }
}

/// Deducts 3 points per `<img>` lacking a non-empty alt attribute.
pub struct ImageAltRule;

impl WebsiteRule for ImageAltRule {
    fn name(&self) -> &str {
        "image-alt"
    }

    fn evaluate(&self, snapshot: &DomSnapshot, card: &mut Scorecard) {
        if snapshot.images == 0 || snapshot.alt_attributes >= snapshot.images {
            return;
        }
        let missing = snapshot.images - snapshot.alt_attributes;
        card.deduct(3.0 * f64::from(missing));
        card.report(Finding::new(
            "W3",
            format!("Total {} image tags are missing alt attributes.", missing),
            Priority::High,
            "Provide descriptive alt text for all images.",
        ));
    }
}

pub struct SingleH1Rule;

impl WebsiteRule for SingleH1Rule {
    fn name(&self) -> &str {
        "single-h1"
    }

    fn evaluate(&self, snapshot: &DomSnapshot, card: &mut Scorecard) {
        if snapshot.h1_count != 1 {
            card.deduct(5.0);
            card.report(Finding::new(
                "W4",
                format!(
                    "Incorrect H1 count ({}). Use only one H1 per page.",
                    snapshot.h1_count
                ),
                Priority::Medium,
                "Ensure a single, descriptive H1 tag exists.",
            ));
        }
    }
}

// ============ Engine ============

/// Ordered rule lists for both scoring paths.
pub struct RuleEngine {
    document_rules: Vec<Box<dyn DocumentRule>>,
    website_rules: Vec<Box<dyn WebsiteRule>>,
}

impl RuleEngine {
    /// An engine with no rules; every input scores 100.
    pub fn new() -> Self {
        Self {
            document_rules: Vec::new(),
            website_rules: Vec::new(),
        }
    }

    /// An engine pre-loaded with the built-in rules, in evaluation order.
    pub fn standard() -> Self {
        let mut engine = Self::new();
        engine.register_document_rule(Box::new(AtsKeywordRule::default()));
        engine.register_document_rule(Box::new(SimulatedOcrRule));
        engine.register_document_rule(Box::new(AltTextHeuristicRule));
        engine.register_website_rule(Box::new(PageTitleRule));
        engine.register_website_rule(Box::new(ImageAltRule));
        engine.register_website_rule(Box::new(SingleH1Rule));
        engine
    }

    /// Append a document rule; it runs after all previously registered ones.
    pub fn register_document_rule(&mut self, rule: Box<dyn DocumentRule>) {
        self.document_rules.push(rule);
    }

    pub fn register_website_rule(&mut self, rule: Box<dyn WebsiteRule>) {
        self.website_rules.push(rule);
    }

    pub fn document_rules(&self) -> &[Box<dyn DocumentRule>] {
        &self.document_rules
    }

    pub fn website_rules(&self) -> &[Box<dyn WebsiteRule>] {
        &self.website_rules
    }

    /// Scores extracted content. `ats_score` is only present for pdf/docx/pptx.
    pub fn score(&self, content: &ExtractedContent, kind: ArtifactKind) -> ScoreResult {
        let input = DocumentInput::new(content, kind);
        let mut card = Scorecard::new();
        for rule in &self.document_rules {
            rule.evaluate(&input, &mut card);
        }
        let ats = if kind.is_document_family() {
            card.ats_score
        } else {
            None
        };
        card.finish(ats)
    }

    /// Scores a website snapshot. Websites never carry an ATS score.
    pub fn score_website(&self, snapshot: &DomSnapshot) -> ScoreResult {
        let mut card = Scorecard::new();
        for rule in &self.website_rules {
            rule.evaluate(snapshot, &mut card);
        }
        card.finish(None)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(result: &ScoreResult) -> Vec<&str> {
        result.findings.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn full_resume_clamps_to_100() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text(
            "Work Experience, Skills, Education and Contact details for Jane Doe",
        );
        let result = engine.score(&content, ArtifactKind::Docx);
        assert_eq!(result.ats_score, Some(100));
        assert!(result.findings.is_empty());
        assert_eq!(result.accessibility_score, 100);
    }

    #[test]
    fn partial_resume_mixes_ats_into_score() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text("skills and education only");
        let result = engine.score(&content, ArtifactKind::Pdf);
        // 95 + 50 * 0.1 = 100
        assert_eq!(result.ats_score, Some(50));
        assert_eq!(result.accessibility_score, 100);

        let content = ExtractedContent::text("nothing relevant, one image");
        let result = engine.score(&content, ArtifactKind::Pptx);
        // 95 + 0 - 5 = 90
        assert_eq!(result.ats_score, Some(0));
        assert_eq!(result.accessibility_score, 90);
        assert_eq!(codes(&result), vec!["A1"]);
    }

    #[test]
    fn alt_text_mention_suppresses_a1() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text("Each IMAGE has Alt Text. Contact me.");
        let result = engine.score(&content, ArtifactKind::Docx);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn image_upload_scores_85_with_single_low_finding() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text("Uploaded graphic received. Size: 0.50 MB.");
        let result = engine.score(&content, ArtifactKind::Image);
        assert_eq!(result.accessibility_score, 85);
        assert_eq!(result.ats_score, None);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].code, "I01");
        assert_eq!(result.findings[0].priority, Priority::Low);
    }

    #[test]
    fn website_scenario_with_every_check_firing() {
        let engine = RuleEngine::standard();
        let snapshot = DomSnapshot {
            title: Some("Ab".to_string()),
            images: 10,
            alt_attributes: 4,
            h1_count: 2,
        };
        let result = engine.score_website(&snapshot);
        assert_eq!(codes(&result), vec!["W1", "W3", "W4"]);
        assert_eq!(result.accessibility_score, 67);
        assert_eq!(result.error_count(), 3);
        assert_eq!(result.ats_score, None);
        assert!(result.findings[1].message.contains("Total 6 image tags"));
        assert!(result.findings[2].message.contains("(2)"));
        assert_eq!(result.findings[2].priority, Priority::Medium);
    }

    #[test]
    fn clean_website_scores_100() {
        let engine = RuleEngine::standard();
        let snapshot = DomSnapshot {
            title: Some("Welcome home".to_string()),
            images: 3,
            alt_attributes: 3,
            h1_count: 1,
        };
        let result = engine.score_website(&snapshot);
        assert_eq!(result.accessibility_score, 100);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn missing_title_counts_as_short() {
        let engine = RuleEngine::standard();
        let snapshot = DomSnapshot {
            title: None,
            images: 0,
            alt_attributes: 0,
            h1_count: 1,
        };
        let result = engine.score_website(&snapshot);
        assert_eq!(codes(&result), vec!["W1"]);
        assert_eq!(result.accessibility_score, 90);
    }

    #[test]
    fn pathological_inputs_stay_in_range() {
        let engine = RuleEngine::standard();
        let snapshot = DomSnapshot {
            title: None,
            images: 10_000,
            alt_attributes: 0,
            h1_count: 40,
        };
        assert_eq!(engine.score_website(&snapshot).accessibility_score, 0);

        for kind in [
            ArtifactKind::Pdf,
            ArtifactKind::Docx,
            ArtifactKind::Pptx,
            ArtifactKind::Image,
            ArtifactKind::Website,
        ] {
            let result = engine.score(&ExtractedContent::default(), kind);
            assert!(result.accessibility_score <= 100);
        }
    }

    #[test]
    fn ats_present_only_for_document_family() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text("experience skills");
        for kind in [ArtifactKind::Pdf, ArtifactKind::Docx, ArtifactKind::Pptx] {
            assert!(engine.score(&content, kind).ats_score.is_some());
        }
        for kind in [ArtifactKind::Image, ArtifactKind::Website] {
            assert!(engine.score(&content, kind).ats_score.is_none());
        }
    }

    #[test]
    fn scoring_is_repeatable() {
        let engine = RuleEngine::standard();
        let content = ExtractedContent::text("An image of my experience");
        let first = engine.score(&content, ArtifactKind::Pdf);
        let second = engine.score(&content, ArtifactKind::Pdf);
        assert_eq!(first, second);
    }

    struct EmptyBodyRule;

    impl DocumentRule for EmptyBodyRule {
        fn name(&self) -> &str {
            "empty-body"
        }

        fn evaluate(&self, input: &DocumentInput<'_>, card: &mut Scorecard) {
            if input.text().trim().is_empty() {
                card.deduct(20.0);
                card.report(Finding::new("D9", "Document has no text.", Priority::High, "Add text."));
            }
        }
    }

    #[test]
    fn registered_rules_run_after_builtins() {
        let mut engine = RuleEngine::standard();
        engine.register_document_rule(Box::new(EmptyBodyRule));
        assert_eq!(engine.document_rules().len(), 4);

        let result = engine.score(&ExtractedContent::default(), ArtifactKind::Docx);
        // 95 + 0 - 20 = 75
        assert_eq!(result.accessibility_score, 75);
        assert_eq!(codes(&result), vec!["D9"]);
    }

    #[test]
    fn standard_rules_are_listed_in_evaluation_order() {
        let engine = RuleEngine::standard();
        let documents: Vec<&str> = engine.document_rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            documents,
            vec!["ats-keywords", "simulated-ocr", "alt-text-heuristic"]
        );
        let websites: Vec<&str> = engine.website_rules().iter().map(|r| r.name()).collect();
        assert_eq!(websites, vec!["page-title", "image-alt", "single-h1"]);
    }
}
