use super::AnswerImportError;
use crate::scoring::{MetricRegistry, RawAnswerSet};
use std::path::Path;
use tracing::{debug, warn};

/// Questionnaire reports authored as markdown: a `## N. <emoji> <label>` heading per domain,
/// followed by a `| question | options | answer |` table.
pub struct MarkdownAnswerImporter;

impl MarkdownAnswerImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        registry: &MetricRegistry,
    ) -> Result<RawAnswerSet, AnswerImportError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content, registry)
    }

    /// Headings that match no domain are skipped together with their tables.
    pub fn from_str(content: &str, registry: &MetricRegistry) -> Result<RawAnswerSet, AnswerImportError> {
        let mut set = RawAnswerSet::new();
        let mut current: Option<Section> = None;

        for line in content.lines() {
            let trimmed = line.trim();
            if let Some(heading) = trimmed.strip_prefix("##") {
                if let Some(section) = current.take() {
                    section.finish(&mut set)?;
                }
                current = match resolve_heading(heading, registry) {
                    Some(domain) => Some(Section::new(domain)),
                    None => {
                        warn!(heading = %heading.trim(), "heading matches no domain; section skipped");
                        None
                    }
                };
                continue;
            }

            if trimmed.starts_with('#') {
                if let Some(section) = current.take() {
                    section.finish(&mut set)?;
                }
                continue;
            }

            if let Some(section) = current.as_mut() {
                if trimmed.starts_with('|') {
                    section.rows.push(cells(trimmed));
                }
            }
        }

        if let Some(section) = current.take() {
            section.finish(&mut set)?;
        }

        debug!(domains = set.len(), "markdown answers parsed");
        Ok(set)
    }
}

struct Section {
    domain: String,
    rows: Vec<Vec<String>>,
}

impl Section {
    fn new(domain: String) -> Self {
        Self {
            domain,
            rows: Vec::new(),
        }
    }

    fn finish(self, set: &mut RawAnswerSet) -> Result<(), AnswerImportError> {
        let Section { domain, rows } = self;
        let mut answers = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let is_header = rows.get(index + 1).is_some_and(|next| is_separator(next));
            if is_header || is_separator(row) || row.len() < 3 {
                continue;
            }
            let answer = row.last().and_then(|cell| cell.parse::<i64>().ok());
            answers.push(answer);
        }

        if set.get(&domain).is_some() {
            return Err(AnswerImportError::DuplicateSection { domain });
        }
        set.insert(domain, answers);
        Ok(())
    }
}

/// Tries the heading text after the `N.` prefix, then without its leading emoji, then the emoji.
fn resolve_heading(heading: &str, registry: &MetricRegistry) -> Option<String> {
    let text = heading.trim_start_matches('#').trim();
    let text = match text.split_once('.') {
        Some((number, rest)) if number.trim().chars().all(|c| c.is_ascii_digit()) => rest.trim(),
        _ => text,
    };

    let mut candidates = vec![text];
    if let Some((first, rest)) = text.split_once(char::is_whitespace) {
        candidates.push(rest.trim());
        candidates.push(first);
    }

    candidates
        .into_iter()
        .find_map(|candidate| registry.resolve_domain(candidate))
        .map(|spec| spec.key.clone())
}

fn cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_separator(row: &[String]) -> bool {
    !row.is_empty()
        && row
            .iter()
            .all(|cell| cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}
