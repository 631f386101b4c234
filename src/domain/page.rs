//! Pages and dashboard tabs a visitor can navigate to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Statistics,
    Age,
    Bmi,
    Charges,
    Gender,
    Children,
    Smoker,
    Region,
    Insights,
    Report,
}

impl TabKind {
    pub const ALL: [TabKind; 10] = [
        TabKind::Statistics,
        TabKind::Age,
        TabKind::Bmi,
        TabKind::Charges,
        TabKind::Gender,
        TabKind::Children,
        TabKind::Smoker,
        TabKind::Region,
        TabKind::Insights,
        TabKind::Report,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            TabKind::Statistics => "statistics",
            TabKind::Age => "age",
            TabKind::Bmi => "bmi",
            TabKind::Charges => "charges",
            TabKind::Gender => "gender",
            TabKind::Children => "children",
            TabKind::Smoker => "smoker",
            TabKind::Region => "region",
            TabKind::Insights => "insights",
            TabKind::Report => "report",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TabKind::Statistics => "Statistics",
            TabKind::Age => "Age Distribution",
            TabKind::Bmi => "BMI Distribution",
            TabKind::Charges => "Charge Distribution",
            TabKind::Gender => "Gender Analysis",
            TabKind::Children => "Children Analysis",
            TabKind::Smoker => "Smoker Analysis",
            TabKind::Region => "Region Analysis",
            TabKind::Insights => "Insights",
            TabKind::Report => "Report",
        }
    }
}

impl Default for TabKind {
    fn default() -> Self {
        TabKind::Statistics
    }
}

impl fmt::Display for TabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for TabKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TabKind::ALL
            .iter()
            .copied()
            .find(|t| t.slug() == s)
            .ok_or_else(|| DomainError::NotFound {
                entity: "Tab",
                field: "name",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Signup,
    Dashboard(TabKind),
    Predict,
}

impl Page {
    pub fn requires_auth(&self) -> bool {
        matches!(self, Page::Dashboard(_) | Page::Predict)
    }
}

impl FromStr for Page {
    type Err = DomainError;

    /// `login`, `signup`, `predict`, `dashboard` or `dashboard/<tab>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_matches('/') {
            "login" => Ok(Page::Login),
            "signup" => Ok(Page::Signup),
            "predict" => Ok(Page::Predict),
            "dashboard" => Ok(Page::Dashboard(TabKind::default())),
            other => match other.strip_prefix("dashboard/") {
                Some(tab) => Ok(Page::Dashboard(tab.parse()?)),
                None => Err(DomainError::NotFound {
                    entity: "Page",
                    field: "path",
                    value: s.to_string(),
                }),
            },
        }
    }
}
