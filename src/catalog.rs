use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{parse_posted, ExperienceLevel, JobListing, JobType, SalaryRange};

pub const CATALOG_SIZE: usize = 100;

struct Template {
    title: &'static str,
    company: &'static str,
    location: &'static str,
    country: &'static str,
    salary: &'static str,
    job_type: JobType,
    schedule: &'static str,
    rating: f32,
    description: &'static str,
    requirements: [&'static str; 3],
    apply_link: &'static str,
    experience_level: ExperienceLevel,
    is_remote: bool,
    salary_range: SalaryRange,
}

static TEMPLATES: [Template; 5] = [
    Template {
        title: "Amazon Delivery Station Warehouse Associate",
        company: "Amazon Warehouse",
        location: "Hattiesburg, MS 39401",
        country: "United States",
        salary: "$18.50 an hour",
        job_type: JobType::PartTime,
        schedule: "Flextime",
        rating: 3.4,
        description: "Join our fast-paced warehouse team and help deliver packages to customers across the region.",
        requirements: ["Must be 18+ years old", "Ability to lift 50lbs", "Reliable transportation"],
        apply_link: "https://www.amazon.jobs/en/jobs/warehouse",
        experience_level: ExperienceLevel::Entry,
        is_remote: false,
        salary_range: SalaryRange::Under50k,
    },
    Template {
        title: "Senior Software Engineer",
        company: "Google",
        location: "Remote",
        country: "United States",
        salary: "$120,000 - $180,000",
        job_type: JobType::FullTime,
        schedule: "Standard hours",
        rating: 4.6,
        description: "Lead engineering initiatives and mentor junior developers in our cloud platform team.",
        requirements: ["5+ years experience", "Strong system design skills", "Leadership experience"],
        apply_link: "https://careers.google.com/jobs/",
        experience_level: ExperienceLevel::Senior,
        is_remote: true,
        salary_range: SalaryRange::Over100k,
    },
    Template {
        title: "Marketing Coordinator",
        company: "Microsoft",
        location: "London, UK",
        country: "United Kingdom",
        salary: "£35,000 - £45,000",
        job_type: JobType::FullTime,
        schedule: "Standard hours",
        rating: 4.3,
        description: "Support marketing campaigns and help drive brand awareness in the European market.",
        requirements: ["Marketing degree", "2+ years experience", "Excellent communication"],
        apply_link: "https://careers.microsoft.com/us/en",
        experience_level: ExperienceLevel::Mid,
        is_remote: false,
        salary_range: SalaryRange::From50kTo75k,
    },
    Template {
        title: "Data Science Intern",
        company: "Meta",
        location: "Menlo Park, CA",
        country: "United States",
        salary: "$8,000 per month",
        job_type: JobType::Internship,
        schedule: "Summer program",
        rating: 4.5,
        description: "Work on machine learning projects and analyze user behavior data.",
        requirements: ["Currently pursuing degree", "Python experience", "Statistical knowledge"],
        apply_link: "https://www.metacareers.com/",
        experience_level: ExperienceLevel::Entry,
        is_remote: false,
        salary_range: SalaryRange::Over100k,
    },
    Template {
        title: "Freelance UX Designer",
        company: "Design Studio Inc",
        location: "Remote",
        country: "Canada",
        salary: "$75 - $100 per hour",
        job_type: JobType::Contract,
        schedule: "Flexible",
        rating: 4.2,
        description: "Design user interfaces for mobile applications and web platforms.",
        requirements: ["3+ years UX experience", "Portfolio required", "Figma proficiency"],
        apply_link: "https://example.com/apply",
        experience_level: ExperienceLevel::Mid,
        is_remote: true,
        salary_range: SalaryRange::From75kTo100k,
    },
];

/// The in-memory set of listings for one session. Read-only once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    listings: Vec<JobListing>,
}

impl Catalog {
    /// Cycles the templates into `CATALOG_SIZE` listings. The posted text
    /// ("<n> days ago", n in 1..=14) is drawn from `rng`, so pass a seeded
    /// generator when the newest/oldest ordering must be reproducible.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let listings = (0..CATALOG_SIZE)
            .map(|i| {
                let template = &TEMPLATES[i % TEMPLATES.len()];
                let cycle = i / TEMPLATES.len() + 1;
                let posted = format!("{} days ago", rng.gen_range(1..=14));
                JobListing {
                    id: (i + 1) as u32,
                    title: format!("{} {}", template.title, cycle),
                    company: template.company.to_string(),
                    location: template.location.to_string(),
                    country: template.country.to_string(),
                    salary: template.salary.to_string(),
                    job_type: template.job_type,
                    schedule: template.schedule.to_string(),
                    rating: template.rating,
                    description: template.description.to_string(),
                    requirements: template.requirements.iter().map(|r| r.to_string()).collect(),
                    posted_minutes_ago: parse_posted(&posted),
                    posted,
                    apply_link: template.apply_link.to_string(),
                    experience_level: template.experience_level,
                    is_remote: template.is_remote,
                    salary_range: template.salary_range,
                }
            })
            .collect();

        tracing::debug!(count = CATALOG_SIZE, "generated catalog");
        Self { listings }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::generate(&mut StdRng::seed_from_u64(seed))
    }

    pub fn random() -> Self {
        Self::generate(&mut rand::thread_rng())
    }

    /// Builds a catalog from prepared listings, deriving the recency value
    /// for any listing that does not carry one.
    #[cfg(test)]
    pub fn from_listings(mut listings: Vec<JobListing>) -> Self {
        for listing in &mut listings {
            if listing.posted_minutes_ago.is_none() {
                listing.posted_minutes_ago = parse_posted(&listing.posted);
            }
        }
        Self { listings }
    }

    pub fn listings(&self) -> &[JobListing] {
        &self.listings
    }

    pub fn get(&self, id: u32) -> Option<&JobListing> {
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_has_one_hundred_unique_ids() {
        for seed in 0..5 {
            let catalog = Catalog::from_seed(seed);
            assert_eq!(catalog.len(), CATALOG_SIZE);
            let ids: HashSet<u32> = catalog.listings().iter().map(|l| l.id).collect();
            assert_eq!(ids.len(), CATALOG_SIZE);
            assert!((1..=100).all(|id| ids.contains(&id)));
        }
    }

    #[test]
    fn test_generate_random_has_one_hundred_listings() {
        assert_eq!(Catalog::random().len(), CATALOG_SIZE);
        assert_eq!(Catalog::random().len(), CATALOG_SIZE);
    }

    #[test]
    fn test_titles_carry_cycle_suffix() {
        let catalog = Catalog::from_seed(7);
        assert_eq!(catalog.get(1).unwrap().title, "Amazon Delivery Station Warehouse Associate 1");
        assert_eq!(catalog.get(2).unwrap().title, "Senior Software Engineer 1");
        assert_eq!(catalog.get(7).unwrap().title, "Senior Software Engineer 2");
        assert_eq!(catalog.get(100).unwrap().title, "Freelance UX Designer 20");
    }

    #[test]
    fn test_every_field_is_populated() {
        let catalog = Catalog::from_seed(1);
        for l in catalog.listings() {
            assert!(l.id > 0);
            for field in [
                &l.title, &l.company, &l.location, &l.country, &l.salary, &l.schedule,
                &l.description, &l.posted, &l.apply_link,
            ] {
                assert!(!field.is_empty(), "listing {} has an empty field", l.id);
            }
            assert_eq!(l.requirements.len(), 3);
            assert!(l.posted_minutes_ago.is_some());
        }
    }

    #[test]
    fn test_posted_days_within_range() {
        let catalog = Catalog::from_seed(42);
        for l in catalog.listings() {
            let minutes = l.posted_minutes_ago.unwrap();
            assert!((1440..=14 * 1440).contains(&minutes), "{}", l.posted);
            assert!(l.posted.ends_with(" days ago"));
        }
    }

    #[test]
    fn test_same_seed_same_catalog() {
        assert_eq!(Catalog::from_seed(9).listings(), Catalog::from_seed(9).listings());
    }

    #[test]
    fn test_from_listings_derives_recency() {
        let mut listing = Catalog::from_seed(3).get(1).unwrap().clone();
        listing.posted = "4 hours ago".to_string();
        listing.posted_minutes_ago = None;
        let catalog = Catalog::from_listings(vec![listing]);
        assert_eq!(catalog.get(1).unwrap().posted_minutes_ago, Some(240));
    }

    #[test]
    fn test_get_missing_id() {
        let catalog = Catalog::from_seed(3);
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(101).is_none());
    }
}
