use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry Level")]
    Entry,
    #[serde(rename = "Mid Level")]
    Mid,
    #[serde(rename = "Senior Level")]
    Senior,
    Executive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalaryRange {
    #[serde(rename = "Under $50k")]
    Under50k,
    #[serde(rename = "$50k-$75k")]
    From50kTo75k,
    #[serde(rename = "$75k-$100k")]
    From75kTo100k,
    #[serde(rename = "Over $100k")]
    Over100k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    /// Accepted but applies no reordering.
    Salary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: u32,
    pub title: String,
    pub company: String,
    pub location: String,
    pub country: String,
    pub salary: String, // display string, e.g. "$18.50 an hour"
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub schedule: String,
    pub rating: f32,
    pub description: String,
    pub requirements: Vec<String>,
    pub posted: String, // "3 days ago"
    pub posted_minutes_ago: Option<u32>,
    pub apply_link: String,
    pub experience_level: ExperienceLevel,
    pub is_remote: bool,
    pub salary_range: SalaryRange,
}

macro_rules! labelled_enum {
    ($ty:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize_label(v.label()) == wanted)
                    .ok_or_else(|| {
                        let options: Vec<&str> = $ty::ALL.iter().map(|v| v.label()).collect();
                        format!("unknown value '{}', expected one of: {}", s, options.join(", "))
                    })
            }
        }
    };
}

labelled_enum!(JobType {
    FullTime => "Full-time",
    PartTime => "Part-time",
    Contract => "Contract",
    Internship => "Internship",
});

labelled_enum!(ExperienceLevel {
    Entry => "Entry Level",
    Mid => "Mid Level",
    Senior => "Senior Level",
    Executive => "Executive",
});

labelled_enum!(SalaryRange {
    Under50k => "Under $50k",
    From50kTo75k => "$50k-$75k",
    From75kTo100k => "$75k-$100k",
    Over100k => "Over $100k",
});

labelled_enum!(SortMode {
    Newest => "newest",
    Oldest => "oldest",
    Salary => "salary",
});

/// Lowercases and drops everything but letters and digits, so "Entry Level",
/// "entry-level" and "ENTRY_LEVEL" all compare equal.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

static POSTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s+(hour|hours|day|days|week|weeks)\s+ago\s*$")
        .expect("posted pattern is valid")
});

/// Converts "<n> <unit> ago" into minutes ago. Anything else is `None`.
pub fn parse_posted(posted: &str) -> Option<u32> {
    let caps = POSTED_RE.captures(posted)?;
    let amount: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    let per_unit = match unit.trim_end_matches('s') {
        "hour" => 60,
        "day" => 60 * 24,
        "week" => 60 * 24 * 7,
        _ => return None,
    };
    amount.checked_mul(per_unit)
}
