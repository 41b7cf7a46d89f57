//! One service per countable entity, sharing a single publisher.

use pipeline_core::{
    CommentPostEnterpriseColumn, CommentPostUserColumn, EnterpriseColumn, PostEnterpriseColumn,
    PostUserColumn, UserColumn, VacancyColumn,
};
use redpanda::MetricPublisher;

use crate::service::MetricService;

pub type UserMetricService = MetricService<UserColumn>;
pub type EnterpriseMetricService = MetricService<EnterpriseColumn>;
pub type VacancyMetricService = MetricService<VacancyColumn>;
pub type PostUserMetricService = MetricService<PostUserColumn>;
pub type PostEnterpriseMetricService = MetricService<PostEnterpriseColumn>;
pub type CommentPostUserMetricService = MetricService<CommentPostUserColumn>;
pub type CommentPostEnterpriseMetricService = MetricService<CommentPostEnterpriseColumn>;

/// Every metric service, ready to be handed to the write paths.
#[derive(Clone)]
pub struct MetricServices {
    pub user: UserMetricService,
    pub enterprise: EnterpriseMetricService,
    pub vacancy: VacancyMetricService,
    pub post_user: PostUserMetricService,
    pub post_enterprise: PostEnterpriseMetricService,
    pub comment_post_user: CommentPostUserMetricService,
    pub comment_post_enterprise: CommentPostEnterpriseMetricService,
}

impl MetricServices {
    pub fn new(publisher: MetricPublisher, topic: &str) -> Self {
        Self {
            user: MetricService::new(publisher.clone(), topic),
            enterprise: MetricService::new(publisher.clone(), topic),
            vacancy: MetricService::new(publisher.clone(), topic),
            post_user: MetricService::new(publisher.clone(), topic),
            post_enterprise: MetricService::new(publisher.clone(), topic),
            comment_post_user: MetricService::new(publisher.clone(), topic),
            comment_post_enterprise: MetricService::new(publisher, topic),
        }
    }
}
