//! Page controller
//!
//! Every navigation goes through [`PageController::resolve`], which checks
//! the visitor's session before handing out a page:
//!
//! - anonymous visitors asking for the dashboard or the predictor land on
//!   the login page
//! - authenticated visitors asking for login or signup land on the default
//!   dashboard tab

use serde::Serialize;
use utoipa::ToSchema;

use crate::application::dashboard::{DashboardRenderer, TabView};
use crate::domain::insurance::{AGE_RANGE, BMI_RANGE, CHILDREN_RANGE};
use crate::domain::{AuthSession, Page, Region, Sex, Smoker, TabKind};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageView {
    Login,
    Signup,
    Dashboard {
        username: String,
        tab: TabKind,
        title: String,
        tabs: Vec<TabLink>,
        view: TabView,
    },
    Predict {
        username: String,
        form: PredictForm,
    },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TabLink {
    pub slug: String,
    pub title: String,
}

impl TabLink {
    /// Every dashboard tab, in display order.
    pub fn all() -> Vec<Self> {
        TabKind::ALL
            .iter()
            .map(|t| TabLink {
                slug: t.slug().to_string(),
                title: t.title().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictForm {
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub input: FieldInput,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldInput {
    Integer { min: u32, max: u32, default: u32 },
    Float { min: f64, max: f64, default: f64 },
    Choice { options: Vec<String>, default: String },
}

/// Outcome of a navigation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Resolution {
    /// True when the visitor was sent somewhere other than requested
    pub redirected: bool,
    pub view: PageView,
}

#[derive(Clone)]
pub struct PageController {
    renderer: DashboardRenderer,
}

impl PageController {
    pub fn new(renderer: DashboardRenderer) -> Self {
        Self { renderer }
    }

    pub fn resolve(&self, session: &AuthSession, requested: Page) -> Resolution {
        let target = match (session.active_username(), requested) {
            (None, page) if page.requires_auth() => Page::Login,
            (Some(_), Page::Login | Page::Signup) => Page::Dashboard(TabKind::default()),
            (_, page) => page,
        };

        let view = match (target, session.active_username()) {
            (Page::Login, _) => PageView::Login,
            (Page::Signup, _) => PageView::Signup,
            (Page::Dashboard(tab), Some(username)) => PageView::Dashboard {
                username: username.to_string(),
                tab,
                title: tab.title().to_string(),
                tabs: TabLink::all(),
                view: self.renderer.render(tab),
            },
            (Page::Predict, Some(username)) => PageView::Predict {
                username: username.to_string(),
                form: predict_form(),
            },
            // Unreachable: protected pages were redirected above.
            (_, None) => PageView::Login,
        };

        Resolution {
            redirected: target != requested,
            view,
        }
    }
}

/// Form description mirroring the prediction request ranges.
pub fn predict_form() -> PredictForm {
    let choice = |options: Vec<&str>| FieldInput::Choice {
        default: options.first().map(|s| s.to_string()).unwrap_or_default(),
        options: options.into_iter().map(str::to_string).collect(),
    };
    let field = |name: &str, label: &str, input: FieldInput| FormField {
        name: name.to_string(),
        label: label.to_string(),
        input,
    };

    PredictForm {
        fields: vec![
            field(
                "age",
                "Age",
                FieldInput::Integer {
                    min: AGE_RANGE.0,
                    max: AGE_RANGE.1,
                    default: 25,
                },
            ),
            field(
                "bmi",
                "BMI",
                FieldInput::Float {
                    min: BMI_RANGE.0,
                    max: BMI_RANGE.1,
                    default: 25.0,
                },
            ),
            field(
                "children",
                "Number of Children",
                FieldInput::Integer {
                    min: CHILDREN_RANGE.0,
                    max: CHILDREN_RANGE.1,
                    default: 0,
                },
            ),
            field("sex", "Gender", choice(Sex::ALL.iter().map(|s| s.as_str()).collect())),
            field(
                "smoker",
                "Smoker",
                choice(Smoker::ALL.iter().map(|s| s.as_str()).collect()),
            ),
            field(
                "region",
                "Region",
                choice(Region::ALL.iter().map(|r| r.as_str()).collect()),
            ),
        ],
    }
}
