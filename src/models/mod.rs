//! Core data models for grant projects, researchers and search operations.

mod project;
mod researcher;
mod search;

pub use project::{
    Allocation, AwardAmount, Category, CurrencyUnit, Field, Institution, Keyword, PeriodOfAward,
    Project, ProjectIdentifier, ProjectStatus,
};
pub use researcher::{
    Affiliation, AffiliationUnit, PersonName, Product, ProductIdentifier, Researcher,
    ResearcherRole, UNKNOWN_NAME,
};
pub use search::{
    Language, ProjectSearchParams, ResearcherSearchParams, SearchResponse, MAX_RESULTS_PER_PAGE,
};
