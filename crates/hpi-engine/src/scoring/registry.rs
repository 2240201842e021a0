use super::error::SchemaError;
use super::names::{metric_key, normalize_name};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Closed integer range every questionnaire answer must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScale {
    pub min: u8,
    pub max: u8,
}

impl AnswerScale {
    pub const fn contains(self, value: i64) -> bool {
        value >= self.min as i64 && value <= self.max as i64
    }

    /// Reflects an answer given on an inverted scale (`min + max - value`).
    pub const fn reflect(self, value: u8) -> u8 {
        self.min + self.max - value
    }

    /// Number of distinct answers on the scale.
    pub const fn answer_count(self) -> usize {
        self.max.saturating_sub(self.min) as usize + 1
    }
}

impl Default for AnswerScale {
    fn default() -> Self {
        Self { min: 1, max: 4 }
    }
}

/// One life sphere of the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub question_count: usize,
    /// 1-based question numbers whose scale runs from best to worst.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reverse_scored: Vec<usize>,
}

impl DomainSpec {
    pub fn short_label(&self) -> &str {
        self.short_label.as_deref().unwrap_or(&self.label)
    }

    pub fn is_reverse_scored(&self, question: usize) -> bool {
        self.reverse_scored.contains(&question)
    }

    fn identifiers(&self) -> impl Iterator<Item = &str> {
        [Some(self.key.as_str()), Some(self.label.as_str())]
            .into_iter()
            .chain([self.short_label.as_deref(), self.emoji.as_deref()])
            .flatten()
            .chain(self.aliases.iter().map(String::as_str))
    }

    fn matches(&self, normalized_identifier: &str) -> bool {
        self.identifiers()
            .any(|identifier| normalize_name(identifier) == normalized_identifier)
    }
}

/// Auxiliary numeric metric with the bounds used to rescale it onto 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub key: String,
    pub domain: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub min: f64,
    pub max: f64,
}

/// Injected schema table: domains, answer scale, metric bounds and aliases.
///
/// Every questionnaire version gets its own registry value, so several can be scored side by
/// side without sharing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegistry {
    pub version: String,
    #[serde(default)]
    pub scale: AnswerScale,
    /// Value each answer contributes to a domain average, lowest answer first. Empty means
    /// answers count at face value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer_values: Vec<f64>,
    pub domains: Vec<DomainSpec>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    /// Alternate metric name -> canonical metric key.
    #[serde(default)]
    pub metric_aliases: BTreeMap<String, String>,
}

impl MetricRegistry {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegistryLoadError> {
        let registry: Self = serde_json::from_reader(reader)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.scale.min >= self.scale.max {
            return Err(SchemaError::InvalidAnswerScale {
                min: self.scale.min,
                max: self.scale.max,
            });
        }
        if !self.answer_values.is_empty() {
            let increasing = self.answer_values.iter().all(|value| value.is_finite())
                && self.answer_values.windows(2).all(|pair| pair[0] < pair[1]);
            if self.answer_values.len() != self.scale.answer_count() || !increasing {
                return Err(SchemaError::InvalidAnswerValues {
                    expected: self.scale.answer_count(),
                });
            }
        }

        let first = self.domains.first().ok_or(SchemaError::EmptyRegistry)?;
        let expected = first.question_count;
        let mut keys = HashSet::new();
        let mut owners: HashMap<String, &str> = HashMap::new();

        for domain in &self.domains {
            if !keys.insert(domain.key.as_str()) {
                return Err(SchemaError::DuplicateDomain {
                    domain: domain.key.clone(),
                });
            }
            if domain.question_count != expected || expected == 0 {
                return Err(SchemaError::QuestionCountMismatch {
                    domain: domain.key.clone(),
                    expected,
                    actual: domain.question_count,
                });
            }
            if let Some(question) = domain
                .reverse_scored
                .iter()
                .copied()
                .find(|question| *question == 0 || *question > domain.question_count)
            {
                return Err(SchemaError::ReverseQuestionOutOfRange {
                    domain: domain.key.clone(),
                    question,
                });
            }

            for identifier in domain.identifiers() {
                let owner = *owners
                    .entry(normalize_name(identifier))
                    .or_insert(domain.key.as_str());
                if owner != domain.key {
                    return Err(SchemaError::AmbiguousIdentifier {
                        identifier: identifier.to_string(),
                        first: owner.to_string(),
                        second: domain.key.clone(),
                    });
                }
            }
        }

        for metric in &self.metrics {
            if !(metric.min.is_finite() && metric.max.is_finite() && metric.min < metric.max) {
                return Err(SchemaError::InvalidMetricBounds {
                    metric: metric.key.clone(),
                    min: metric.min,
                    max: metric.max,
                });
            }
            if !keys.contains(metric.domain.as_str()) {
                return Err(SchemaError::MetricDomain {
                    metric: metric.key.clone(),
                    domain: metric.domain.clone(),
                });
            }
        }

        for (alias, target) in &self.metric_aliases {
            if self.metric(target).is_none() {
                return Err(SchemaError::AliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn domains(&self) -> &[DomainSpec] {
        &self.domains
    }

    /// What `answer` contributes to a domain average under `answer_values`.
    pub fn answer_value(&self, answer: u8) -> f64 {
        answer
            .checked_sub(self.scale.min)
            .and_then(|offset| self.answer_values.get(usize::from(offset)))
            .copied()
            .unwrap_or_else(|| f64::from(answer))
    }

    pub fn domain(&self, key: &str) -> Option<&DomainSpec> {
        self.domains.iter().find(|domain| domain.key == key)
    }

    /// Finds a domain by key, label, short label, emoji or alias.
    pub fn resolve_domain(&self, identifier: &str) -> Option<&DomainSpec> {
        self.resolve_domain_index(identifier)
            .map(|index| &self.domains[index])
    }

    /// Position of the resolved domain in canonical order.
    pub fn resolve_domain_index(&self, identifier: &str) -> Option<usize> {
        let normalized = normalize_name(identifier);
        if normalized.is_empty() {
            return None;
        }
        self.domains
            .iter()
            .position(|domain| domain.matches(&normalized))
    }

    pub fn question_count(&self) -> usize {
        self.domains
            .first()
            .map(|domain| domain.question_count)
            .unwrap_or(0)
    }

    pub fn metric(&self, key: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|metric| metric.key == key)
    }

    /// Resolves a free-form metric name through the canonical keys, then the alias table.
    pub fn resolve_metric(&self, name: &str) -> Option<&MetricSpec> {
        let key = metric_key(name);
        if let Some(metric) = self.metric(&key) {
            return Some(metric);
        }

        self.metric_aliases
            .iter()
            .find(|(alias, _)| metric_key(alias) == key)
            .and_then(|(_, target)| self.metric(target))
    }

    /// Registry for the eight-sphere questionnaire, six questions each.
    pub fn standard() -> Self {
        let domains = vec![
            domain(
                "relations_love",
                "Relationships with loved ones",
                "Loved ones",
                "\u{1f496}",
                &["Отношения с любимыми", "love", "partner"],
                &[],
            ),
            domain(
                "relations_family",
                "Family",
                "Family",
                "\u{1f3e1}",
                &["Отношения с родными", "relatives"],
                &[],
            ),
            domain(
                "friends",
                "Friends",
                "Friends",
                "\u{1f91d}",
                &["Друзья", "friendship"],
                &[],
            ),
            domain(
                "career",
                "Career",
                "Career",
                "\u{1f4bc}",
                &["Карьера", "work"],
                &[6],
            ),
            domain(
                "physical_health",
                "Physical health",
                "Phys. health",
                "\u{2642}\u{fe0f}",
                &["Физическое здоровье", "health"],
                &[],
            ),
            domain(
                "mental_health",
                "Mental health",
                "Mental health",
                "\u{1f9e0}",
                &["Ментальное здоровье", "mind"],
                &[6],
            ),
            domain(
                "hobbies",
                "Hobbies & interests",
                "Hobbies",
                "\u{1f3a8}",
                &["Хобби и увлечения", "Хобби"],
                &[],
            ),
            domain(
                "wealth",
                "Wealth",
                "Wealth",
                "\u{1f4b0}",
                &["Благосостояние", "finances"],
                &[6],
            ),
        ];

        let metrics = vec![
            metric("hours_together_per_week", "relations_love", "Hours together per week", "h", 0.0, 40.0),
            metric("shared_activities_per_month", "relations_love", "Shared activities per month", "", 0.0, 12.0),
            metric("communication_quality", "relations_love", "Communication quality", "1-10", 1.0, 10.0),
            metric("calls_to_parents_per_week", "relations_family", "Calls to parents per week", "", 0.0, 7.0),
            metric("family_meetings_per_month", "relations_family", "Family meetings per month", "", 0.0, 8.0),
            metric("family_time_per_week", "relations_family", "Family time per week", "h", 0.0, 20.0),
            metric("friend_meetups_per_month", "friends", "Meetups with friends per month", "", 0.0, 12.0),
            metric("new_acquaintances_per_month", "friends", "New acquaintances per month", "", 0.0, 10.0),
            metric("social_time_per_week", "friends", "Social time per week", "h", 0.0, 20.0),
            metric("learning_hours_per_week", "career", "Learning hours per week", "h", 0.0, 20.0),
            metric("new_skills_mastered", "career", "New skills mastered per quarter", "", 0.0, 5.0),
            metric("monthly_income", "career", "Monthly income", "k", 0.0, 500.0),
            metric("workouts_per_week", "physical_health", "Workouts per week", "", 0.0, 7.0),
            metric("sleep_quality", "physical_health", "Sleep quality", "1-10", 1.0, 10.0),
            metric("meditation_minutes_per_day", "mental_health", "Meditation minutes per day", "min", 0.0, 60.0),
            metric("stress_level", "mental_health", "Stress level", "1-10", 1.0, 10.0),
            metric("rest_quality", "mental_health", "Rest quality", "1-10", 1.0, 10.0),
            metric("hobby_hours_per_week", "hobbies", "Hobby hours per week", "h", 0.0, 20.0),
            metric("new_projects_started", "hobbies", "New projects started per month", "", 0.0, 5.0),
            metric("hobby_satisfaction", "hobbies", "Hobby satisfaction", "1-10", 1.0, 10.0),
            metric("savings_percent", "wealth", "Savings", "%", 0.0, 100.0),
            metric("passive_income_per_month", "wealth", "Passive income per month", "k", 0.0, 200.0),
            metric("financial_stability", "wealth", "Financial stability", "1-10", 1.0, 10.0),
        ];

        const ALIASES: &[(&str, &str)] = &[
            ("часы_вместе_в_неделю", "hours_together_per_week"),
            ("совместные_ужины_в_неделю", "hours_together_per_week"),
            ("число_совместных_активностей", "shared_activities_per_month"),
            ("число_совместных_мероприятий_в_месяц", "shared_activities_per_month"),
            ("качество_общения", "communication_quality"),
            ("качество_общения_1_10", "communication_quality"),
            ("звонки_родителям_в_неделю", "calls_to_parents_per_week"),
            ("семейных_встреч_в_месяц", "family_meetings_per_month"),
            ("длительность_общения_в_неделю", "family_time_per_week"),
            ("встречи_с_друзьями_в_месяц", "friend_meetups_per_month"),
            ("новых_знакомств_в_месяц", "new_acquaintances_per_month"),
            ("время_на_общение_в_неделю", "social_time_per_week"),
            ("professional_development", "learning_hours_per_week"),
            ("часов_обучения_в_неделю", "learning_hours_per_week"),
            ("новых_навыков_освоено", "new_skills_mastered"),
            ("доход_в_месяц", "monthly_income"),
            ("physical_activity", "workouts_per_week"),
            ("тренировок_в_неделю", "workouts_per_week"),
            ("качество_сна", "sleep_quality"),
            ("минут_медитации_в_день", "meditation_minutes_per_day"),
            ("уровень_стресса", "stress_level"),
            ("уровень_стресса_1_10", "stress_level"),
            ("качество_отдыха", "rest_quality"),
            ("часов_на_хобби_в_неделю", "hobby_hours_per_week"),
            ("creative_activity", "hobby_hours_per_week"),
            ("новых_проектов_начато", "new_projects_started"),
            ("удовлетворенность_хобби", "hobby_satisfaction"),
            ("сбережения", "savings_percent"),
            ("сбережения_проц_от_дохода", "savings_percent"),
            ("пассивный_доход_в_месяц", "passive_income_per_month"),
            ("финансовая_стабильность", "financial_stability"),
        ];

        let metric_aliases = ALIASES
            .iter()
            .map(|(alias, target)| (alias.to_string(), target.to_string()))
            .collect();

        Self {
            version: "standard-v1".to_string(),
            scale: AnswerScale::default(),
            answer_values: Vec::new(),
            domains,
            metrics,
            metric_aliases,
        }
    }
}

fn domain(
    key: &str,
    label: &str,
    short_label: &str,
    emoji: &str,
    aliases: &[&str],
    reverse_scored: &[usize],
) -> DomainSpec {
    DomainSpec {
        key: key.to_string(),
        label: label.to_string(),
        short_label: Some(short_label.to_string()),
        emoji: Some(emoji.to_string()),
        aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
        question_count: 6,
        reverse_scored: reverse_scored.to_vec(),
    }
}

fn metric(key: &str, domain: &str, label: &str, unit: &str, min: f64, max: f64) -> MetricSpec {
    MetricSpec {
        key: key.to_string(),
        domain: domain.to_string(),
        label: label.to_string(),
        unit: (!unit.is_empty()).then(|| unit.to_string()),
        min,
        max,
    }
}

#[derive(Debug)]
pub enum RegistryLoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Schema(SchemaError),
}

impl fmt::Display for RegistryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryLoadError::Io(err) => write!(f, "failed to read metric registry: {}", err),
            RegistryLoadError::Json(err) => write!(f, "invalid metric registry JSON: {}", err),
            RegistryLoadError::Schema(err) => write!(f, "inconsistent metric registry: {}", err),
        }
    }
}

impl std::error::Error for RegistryLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryLoadError::Io(err) => Some(err),
            RegistryLoadError::Json(err) => Some(err),
            RegistryLoadError::Schema(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RegistryLoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for RegistryLoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<SchemaError> for RegistryLoadError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}
