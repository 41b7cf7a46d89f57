//! Metric catalogue: countable entities, their counter columns, and actions.
//!
//! Every entity owns a closed set of columns. `MetricColumn` pairs the two at
//! the type level, so a typed caller cannot send a post column against a user
//! entity. String input goes through [`MetricColumn::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Aggregate table a metric delta targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricEntity {
    #[serde(rename = "USER_METRIC")]
    User,
    #[serde(rename = "ENTERPRISE_METRIC")]
    Enterprise,
    #[serde(rename = "VACANCY_METRIC")]
    Vacancy,
    #[serde(rename = "POST_USER_METRIC")]
    PostUser,
    #[serde(rename = "POST_ENTERPRISE_METRIC")]
    PostEnterprise,
    #[serde(rename = "COMMENT_POST_USER_METRIC")]
    CommentPostUser,
    #[serde(rename = "COMMENT_POST_ENTERPRISE_METRIC")]
    CommentPostEnterprise,
}

impl MetricEntity {
    pub const ALL: &'static [MetricEntity] = &[
        Self::User,
        Self::Enterprise,
        Self::Vacancy,
        Self::PostUser,
        Self::PostEnterprise,
        Self::CommentPostUser,
        Self::CommentPostEnterprise,
    ];

    /// Wire tag for this entity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER_METRIC",
            Self::Enterprise => "ENTERPRISE_METRIC",
            Self::Vacancy => "VACANCY_METRIC",
            Self::PostUser => "POST_USER_METRIC",
            Self::PostEnterprise => "POST_ENTERPRISE_METRIC",
            Self::CommentPostUser => "COMMENT_POST_USER_METRIC",
            Self::CommentPostEnterprise => "COMMENT_POST_ENTERPRISE_METRIC",
        }
    }

    /// Column names valid for this entity.
    pub fn column_names(&self) -> Vec<&'static str> {
        fn names<C: EntityColumn>() -> Vec<&'static str> {
            C::ALL.iter().map(|c| c.as_str()).collect()
        }

        match self {
            Self::User => names::<UserColumn>(),
            Self::Enterprise => names::<EnterpriseColumn>(),
            Self::Vacancy => names::<VacancyColumn>(),
            Self::PostUser => names::<PostUserColumn>(),
            Self::PostEnterprise => names::<PostEnterpriseColumn>(),
            Self::CommentPostUser => names::<CommentPostUserColumn>(),
            Self::CommentPostEnterprise => names::<CommentPostEnterpriseColumn>(),
        }
    }
}

impl fmt::Display for MetricEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricEntity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| Error::UnknownEntity(s.to_string()))
    }
}

/// Direction of a delta. Every event moves a counter by exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricAction {
    /// Increment by one.
    #[serde(rename = "SUM")]
    Sum,
    /// Decrement by one.
    #[serde(rename = "RED")]
    Red,
}

impl MetricAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Red => "RED",
        }
    }

    /// Signed change applied to the counter.
    pub fn delta(&self) -> i64 {
        match self {
            Self::Sum => 1,
            Self::Red => -1,
        }
    }

    /// Action that undoes this one.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Sum => Self::Red,
            Self::Red => Self::Sum,
        }
    }
}

impl fmt::Display for MetricAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column enum bound to exactly one entity.
pub trait EntityColumn: Copy + Send + Sync + fmt::Debug + Into<MetricColumn> + 'static {
    /// Entity every value of this type belongs to.
    const ENTITY: MetricEntity;
    /// The full closed set.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(column: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == column)
    }
}

macro_rules! entity_columns {
    (
        $(#[$meta:meta])*
        $name:ident => $entity:ident, $wrap:ident {
            $($variant:ident => $column:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $column)]
                $variant,
            )+
        }

        impl EntityColumn for $name {
            const ENTITY: MetricEntity = MetricEntity::$entity;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $column,)+
                }
            }
        }

        impl From<$name> for MetricColumn {
            fn from(column: $name) -> Self {
                MetricColumn::$wrap(column)
            }
        }
    };
}

entity_columns! {
    /// Counters on a user profile.
    UserColumn => User, User {
        FollowerCount => "follower_count",
        FollowingCount => "following_count",
        ConnectionCount => "connection_count",
        PostCount => "post_count",
        ApplicationCount => "application_count",
        ProfileViewCount => "profile_view_count",
    }
}

entity_columns! {
    /// Counters on an enterprise profile.
    EnterpriseColumn => Enterprise, Enterprise {
        FollowerCount => "follower_count",
        EmployeeCount => "employee_count",
        PostCount => "post_count",
        VacancyCount => "vacancy_count",
        ProfileViewCount => "profile_view_count",
    }
}

entity_columns! {
    /// Counters on a vacancy.
    VacancyColumn => Vacancy, Vacancy {
        ViewCount => "view_count",
        ApplicationCount => "application_count",
        SaveCount => "save_count",
    }
}

entity_columns! {
    /// Counters on a post authored by a user.
    PostUserColumn => PostUser, PostUser {
        ViewCount => "view_count",
        LikeCount => "like_count",
        CommentCount => "comment_count",
        ShareCount => "share_count",
    }
}

entity_columns! {
    /// Counters on a post authored by an enterprise.
    PostEnterpriseColumn => PostEnterprise, PostEnterprise {
        ViewCount => "view_count",
        LikeCount => "like_count",
        CommentCount => "comment_count",
        ShareCount => "share_count",
    }
}

entity_columns! {
    /// Counters on a comment under a user post.
    CommentPostUserColumn => CommentPostUser, CommentPostUser {
        LikeCount => "like_count",
        ReplyCount => "reply_count",
    }
}

entity_columns! {
    /// Counters on a comment under an enterprise post.
    CommentPostEnterpriseColumn => CommentPostEnterprise, CommentPostEnterprise {
        LikeCount => "like_count",
        ReplyCount => "reply_count",
    }
}

/// A counter column together with the entity it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricColumn {
    User(UserColumn),
    Enterprise(EnterpriseColumn),
    Vacancy(VacancyColumn),
    PostUser(PostUserColumn),
    PostEnterprise(PostEnterpriseColumn),
    CommentPostUser(CommentPostUserColumn),
    CommentPostEnterprise(CommentPostEnterpriseColumn),
}

impl MetricColumn {
    /// Entity tag implied by the variant.
    pub fn entity(&self) -> MetricEntity {
        match self {
            Self::User(_) => MetricEntity::User,
            Self::Enterprise(_) => MetricEntity::Enterprise,
            Self::Vacancy(_) => MetricEntity::Vacancy,
            Self::PostUser(_) => MetricEntity::PostUser,
            Self::PostEnterprise(_) => MetricEntity::PostEnterprise,
            Self::CommentPostUser(_) => MetricEntity::CommentPostUser,
            Self::CommentPostEnterprise(_) => MetricEntity::CommentPostEnterprise,
        }
    }

    /// Column name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User(c) => c.as_str(),
            Self::Enterprise(c) => c.as_str(),
            Self::Vacancy(c) => c.as_str(),
            Self::PostUser(c) => c.as_str(),
            Self::PostEnterprise(c) => c.as_str(),
            Self::CommentPostUser(c) => c.as_str(),
            Self::CommentPostEnterprise(c) => c.as_str(),
        }
    }

    /// Resolves a column name against the closed set of `entity`.
    pub fn parse(entity: MetricEntity, column: &str) -> Result<Self> {
        fn lookup<C: EntityColumn>(column: &str) -> Result<MetricColumn> {
            C::parse(column)
                .map(Into::into)
                .ok_or_else(|| Error::invalid_column(C::ENTITY.as_str(), column))
        }

        match entity {
            MetricEntity::User => lookup::<UserColumn>(column),
            MetricEntity::Enterprise => lookup::<EnterpriseColumn>(column),
            MetricEntity::Vacancy => lookup::<VacancyColumn>(column),
            MetricEntity::PostUser => lookup::<PostUserColumn>(column),
            MetricEntity::PostEnterprise => lookup::<PostEnterpriseColumn>(column),
            MetricEntity::CommentPostUser => lookup::<CommentPostUserColumn>(column),
            MetricEntity::CommentPostEnterprise => lookup::<CommentPostEnterpriseColumn>(column),
        }
    }
}

impl fmt::Display for MetricColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity(), self.as_str())
    }
}
