use std::borrow::Cow;

use async_trait::async_trait;
use shared::{
    domain::{User, UserId, UserRole, UserStatus},
    error::{require, LoadError, ValidationError},
    protocol::PlaceholderUser,
};
use tracing::info;
use url::Url;

use super::{below, pick};
use crate::{
    export::{Cell, ExportOptions, Exportable},
    record::Record,
    source::{endpoint, DataSource, HttpSource},
};

/// Role draw for directory users: mostly plain users.
const ROLE_DRAW: [UserRole; 5] = [
    UserRole::User,
    UserRole::User,
    UserRole::User,
    UserRole::Manager,
    UserRole::Admin,
];

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub admins: usize,
    pub managers: usize,
    pub users: usize,
}

impl Record for User {
    type Id = UserId;
    type Patch = UserPatch;
    type Summary = UserSummary;

    const KIND: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }

    fn set_id(&mut self, id: UserId) {
        self.id = id;
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.city.as_str()]
    }

    fn category(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "role" => Some(Cow::Borrowed(self.role.as_str())),
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "email",
                value: self.email.clone(),
            });
        }
        Ok(())
    }

    fn summarize(all: &[Self], _filtered: &[Self]) -> UserSummary {
        let mut summary = UserSummary {
            total: all.len(),
            ..UserSummary::default()
        };
        for user in all {
            match user.status {
                UserStatus::Active => summary.active += 1,
                UserStatus::Inactive => summary.inactive += 1,
            }
            match user.role {
                UserRole::Admin => summary.admins += 1,
                UserRole::Manager => summary.managers += 1,
                UserRole::User => summary.users += 1,
            }
        }
        summary
    }
}

impl Exportable for User {
    const FILE_STEM: &'static str = "users";
    const OPTIONS: ExportOptions = ExportOptions::COMMA;

    fn headers() -> &'static [&'static str] {
        &["ID", "Name", "Email", "Phone", "City", "Role", "Status", "Company"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.id.0.into(),
            self.name.as_str().into(),
            self.email.as_str().into(),
            self.phone.as_str().into(),
            self.city.as_str().into(),
            self.role.as_str().into(),
            self.status.as_str().into(),
            self.company.as_str().into(),
        ]
    }
}

pub fn from_placeholder(user: PlaceholderUser) -> User {
    let id = user.id;
    User {
        id: UserId(id),
        name: user.name,
        email: user.email,
        phone: user
            .phone
            .filter(|phone| !phone.trim().is_empty())
            .unwrap_or_else(|| "(not provided)".to_string()),
        city: user.address.city,
        role: pick(&ROLE_DRAW, id, 1),
        // Roughly one in five directory users is inactive.
        status: if below(id, 2, 10) < 2 {
            UserStatus::Inactive
        } else {
            UserStatus::Active
        },
        company: user.company.name,
        website: user.website.unwrap_or_default(),
    }
}

/// Unsaved user built from the create form; `create` assigns the id.
pub fn draft(
    name: impl Into<String>,
    email: impl Into<String>,
    role: UserRole,
    status: UserStatus,
) -> User {
    User {
        id: UserId(0),
        name: name.into(),
        email: email.into(),
        phone: String::new(),
        city: String::new(),
        role,
        status,
        company: "New company".to_string(),
        website: "example.com".to_string(),
    }
}

/// Back-office staff accounts appended to every directory load.
pub fn local_users() -> Vec<User> {
    vec![
        User {
            id: UserId(1001),
            name: "Admin Principal".into(),
            email: "admin@backoffice.com".into(),
            phone: "01 23 45 67 89".into(),
            city: "Paris".into(),
            role: UserRole::Admin,
            status: UserStatus::Active,
            company: "BackOffice Inc.".into(),
            website: "backoffice.com".into(),
        },
        User {
            id: UserId(1002),
            name: "Gestionnaire Test".into(),
            email: "manager@backoffice.com".into(),
            phone: "06 12 34 56 78".into(),
            city: "Lyon".into(),
            role: UserRole::Manager,
            status: UserStatus::Active,
            company: "BackOffice Inc.".into(),
            website: "backoffice.com".into(),
        },
    ]
}

pub fn fallback_users() -> Vec<User> {
    local_users()
}

/// `GET {jsonplaceholder}/users` plus the local staff accounts.
#[derive(Debug, Clone)]
pub struct UsersSource {
    http: HttpSource,
    base: Url,
}

impl UsersSource {
    pub fn new(http: HttpSource, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl DataSource<User> for UsersSource {
    async fn fetch(&self) -> Result<Vec<User>, LoadError> {
        let url = endpoint(&self.base, "users", None)?;
        let remote: Vec<PlaceholderUser> = self.http.get_list(&url, Some("users")).await?;
        info!(%url, count = remote.len(), "directory users fetched");

        let mut users: Vec<User> = remote.into_iter().map(from_placeholder).collect();
        users.extend(local_users());
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use shared::protocol::{PlaceholderAddress, PlaceholderCompany};

    use super::*;
    use crate::{controller::ListController, export::export_delimited, filter::Query};

    fn placeholder(id: i64, name: &str, city: &str) -> PlaceholderUser {
        PlaceholderUser {
            id,
            name: name.into(),
            username: String::new(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: None,
            website: Some("example.org".into()),
            address: PlaceholderAddress {
                street: "Kulas Light".into(),
                suite: String::new(),
                city: city.into(),
                zipcode: "92998".into(),
            },
            company: PlaceholderCompany {
                name: "Romaguera-Crona".into(),
            },
        }
    }

    #[test]
    fn mapping_is_deterministic_and_fills_missing_phone() {
        let first = from_placeholder(placeholder(4, "Patricia Lebsack", "South Elvis"));
        let second = from_placeholder(placeholder(4, "Patricia Lebsack", "South Elvis"));
        assert_eq!(first, second);
        assert_eq!(first.phone, "(not provided)");
        assert_eq!(first.city, "South Elvis");
    }

    #[test]
    fn search_covers_name_email_and_city() {
        let user = from_placeholder(placeholder(1, "Leanne Graham", "Gwenborough"));
        let fields = user.search_fields();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains(&"Gwenborough"));
    }

    #[test]
    fn role_filter_and_summary_follow_the_local_accounts() {
        let mut controller = ListController::headless(10, Vec::new());
        controller.create(draft("Ops", "ops@backoffice.com", UserRole::User, UserStatus::Inactive))
            .expect("create");
        for user in local_users() {
            controller.create(user).expect("create");
        }

        controller.apply_query(Query::new().category("role", "manager"));

        assert_eq!(controller.filtered_items().len(), 1);
        assert_eq!(controller.filtered_items()[0].email, "manager@backoffice.com");
        let summary = controller.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.admins, 1);
    }

    #[test]
    fn invalid_email_is_rejected() {
        let err = draft("Nobody", "not-an-email", UserRole::User, UserStatus::Active)
            .validate()
            .expect_err("invalid email");
        assert!(matches!(err, ValidationError::InvalidValue { field: "email", .. }));
    }

    #[test]
    fn export_uses_commas_and_quotes_embedded_commas() {
        let mut users = local_users();
        users[0].company = "BackOffice, Inc.".into();
        let csv = export_delimited(&users).expect("export");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ID,Name,Email,Phone,City,Role,Status,Company");
        assert!(lines[1].ends_with(",admin,active,\"BackOffice, Inc.\""));
        assert_eq!(lines.len(), 3);
    }
}
