use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::payments::confirm_payment,
        crate::routes::payments::get_subscription,
        crate::routes::progress::complete_lesson,
        crate::routes::progress::complete_module,
        crate::routes::progress::add_time_spent,
        crate::routes::progress::dashboard,
        crate::routes::progress::module_access,
        crate::routes::questions::ask_question,
        crate::routes::questions::answer_question,
        crate::routes::questions::close_question,
        crate::routes::comments::create_comment,
        crate::routes::comments::update_comment,
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_notification_read,
        crate::routes::notifications::mark_all_read
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::SessionResponse,
            crate::routes::auth::AccountResponse,
            crate::routes::payments::ConfirmPaymentRequest,
            crate::routes::payments::SubscriptionResponse,
            crate::routes::progress::ProgressResponse,
            crate::routes::progress::ModuleResultRequest,
            crate::routes::progress::ModuleResultResponse,
            crate::routes::progress::TimeSpentRequest,
            crate::routes::progress::DashboardResponse,
            crate::routes::progress::ModuleAccessResponse,
            crate::routes::questions::AskQuestionRequest,
            crate::routes::questions::AnswerQuestionRequest,
            crate::routes::questions::QuestionResponse,
            crate::routes::comments::CreateCommentRequest,
            crate::routes::comments::UpdateCommentRequest,
            crate::routes::comments::CommentResponse,
            crate::routes::notifications::NotificationsResponse,
            crate::routes::notifications::NotificationResponse,
            crate::routes::notifications::BulkUpdateResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Subscriptions", description = "Payment confirmation and entitlement"),
        (name = "Progress", description = "Lesson, module and study-time tracking"),
        (name = "Questions", description = "Learner questions to curators"),
        (name = "Comments", description = "Lesson comments"),
        (name = "Notifications", description = "In-app notifications")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "bearerAuth".to_string(),
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
