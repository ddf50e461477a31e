//! The operation table.
//!
//! # Overview
//! Each TalentLMS endpoint is one `Operation` constant: HTTP method, path
//! template, required and optional parameter names, fields whose entries are
//! merged into the payload, and the credential it needs. The `operations!`
//! macro turns every row into both the constant and a same-named `Client`
//! method, so the table is the single source of truth for the surface.
//!
//! Read operations (GET) carry their non-path parameters as a trailing
//! `name:value,...` path segment; mutating operations (POST) carry them as a
//! form-encoded body. See `Client::build_request`.

use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::{HttpMethod, Transport};
use crate::types::Params;

/// Which credential an operation authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// Primary key with the empty password.
    Primary,
    /// Primary key with the secondary key as password, when one is
    /// configured.
    Secondary,
}

/// Fixed definition of one remote operation.
///
/// `path` may contain `{name}` placeholders. Parameters named there are
/// substituted into the URL and implicitly required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Object-valued parameters whose entries are spliced into the top
    /// level of the payload instead of being bracket-encoded.
    pub merged: &'static [&'static str],
    /// Boolean parameters the service spells as words: `(name, on, off)`.
    pub flags: &'static [(&'static str, &'static str, &'static str)],
    pub auth: AuthScope,
}

impl Operation {
    pub const fn get(path: &'static str) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub const fn post(path: &'static str) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    const fn new(method: HttpMethod, path: &'static str) -> Self {
        Self {
            name: path,
            method,
            path,
            required: &[],
            optional: &[],
            merged: &[],
            flags: &[],
            auth: AuthScope::Primary,
        }
    }

    pub const fn named(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    pub const fn required(self, required: &'static [&'static str]) -> Self {
        Self { required, ..self }
    }

    pub const fn optional(self, optional: &'static [&'static str]) -> Self {
        Self { optional, ..self }
    }

    pub const fn merged(self, merged: &'static [&'static str]) -> Self {
        Self { merged, ..self }
    }

    pub const fn flags(self, flags: &'static [(&'static str, &'static str, &'static str)]) -> Self {
        Self { flags, ..self }
    }

    pub const fn secondary_auth(self) -> Self {
        Self {
            auth: AuthScope::Secondary,
            ..self
        }
    }

    /// Whether `name` is declared anywhere in this definition.
    pub fn declares(&self, name: &str) -> bool {
        self.required.contains(&name)
            || self.optional.contains(&name)
            || self.merged.contains(&name)
            || placeholders(self.path).any(|p| p == name)
    }

    /// The wire word for boolean `value` of parameter `name`, if it is a flag.
    pub fn flag_word(&self, name: &str, value: bool) -> Option<&'static str> {
        self.flags
            .iter()
            .find(|(flag, _, _)| *flag == name)
            .map(|&(_, on, off)| if value { on } else { off })
    }
}

/// `{name}` placeholders of a path template, in template order.
pub(crate) fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    template.split('{').skip(1).filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
}

/// Look an operation up by its method name, e.g. `"user_signup"`.
pub fn find(name: &str) -> Option<&'static Operation> {
    ALL.iter().copied().find(|op| op.name == name)
}

macro_rules! operations {
    ($(
        $(#[doc = $doc:literal])*
        $method:ident => $konst:ident = $def:expr;
    )*) => {
        $(
            $(#[doc = $doc])*
            pub const $konst: Operation = $def.named(stringify!($method));
        )*

        /// Every operation, in declaration order.
        pub const ALL: &[&Operation] = &[$(&$konst),*];

        impl<T: Transport> Client<T> {
            $(
                $(#[doc = $doc])*
                pub fn $method(&self, params: &Params) -> Result<Value> {
                    self.call(&$konst, params)
                }
            )*
        }
    };
}

operations! {
    /// All users (abridged), or one user in full when `id`, `email` or
    /// `username` is given.
    users => USERS = Operation::get("users")
        .optional(&["id", "email", "username"]);

    /// One-time login link for a user.
    user_login => USER_LOGIN = Operation::post("userlogin")
        .required(&["login", "password"])
        .optional(&["logout_redirect"])
        .secondary_auth();

    /// Logout link for a user. The user stays logged in until it is followed.
    user_logout => USER_LOGOUT = Operation::post("userlogout")
        .required(&["user_id"])
        .optional(&["next"])
        .secondary_auth();

    /// Create a user. `custom_fields` is an object of `custom_field_N`
    /// entries merged into the payload.
    user_signup => USER_SIGNUP = Operation::post("user/signup")
        .required(&["first_name", "last_name", "email", "login", "password"])
        .merged(&["custom_fields"]);

    delete_user => DELETE_USER = Operation::post("deleteuser")
        .required(&["user_id"])
        .optional(&["deleted_by_user_id", "permanent"])
        .flags(&[("permanent", "yes", "no")])
        .secondary_auth();

    edit_user => EDIT_USER = Operation::post("edituser")
        .required(&["user_id"])
        .optional(&[
            "first_name", "last_name", "email", "login", "password", "bio", "timezone",
            "credits",
        ])
        .merged(&["custom_fields"]);

    /// `status` is `active` or `inactive`, or a boolean.
    user_set_status => USER_SET_STATUS = Operation::get("usersetstatus")
        .required(&["user_id", "status"])
        .flags(&[("status", "active", "inactive")]);

    courses => COURSES = Operation::get("courses")
        .optional(&["id"]);

    create_course => CREATE_COURSE = Operation::post("createcourse")
        .required(&["name"])
        .optional(&["description", "category_id", "code", "price", "time_limit", "creator_id"]);

    delete_course => DELETE_COURSE = Operation::post("deletecourse")
        .required(&["course_id"])
        .optional(&["deleted_by_user_id"]);

    categories => CATEGORIES = Operation::get("categories")
        .optional(&["id"]);

    groups => GROUPS = Operation::get("groups")
        .optional(&["id"]);

    /// `key` lets users join the group, and `add_user_to_group` needs it.
    create_group => CREATE_GROUP = Operation::post("creategroup")
        .required(&["name"])
        .optional(&["description", "key", "price", "creator_id", "max_redemptions"]);

    delete_group => DELETE_GROUP = Operation::post("deletegroup")
        .required(&["group_id"])
        .optional(&["deleted_by_user_id"]);

    branches => BRANCHES = Operation::get("branches")
        .optional(&["id"]);

    create_branch => CREATE_BRANCH = Operation::post("createbranch")
        .required(&["name"])
        .optional(&[
            "description",
            "disallow_global_login",
            "group_id",
            "language",
            "timezone",
            "signup_method",
            "user_type",
            "registration_email_restriction",
            "users_limit",
            "ecommerce_processor",
            "currency",
            "paypal_email",
            "ecommerce_subscription",
            "ecommerce_subscription_price",
            "ecommerce_subscription_interval",
            "ecommerce_credits",
            "internal_announcement",
            "external_announcement",
            "creator_id",
        ]);

    delete_branch => DELETE_BRANCH = Operation::post("deletebranch")
        .required(&["branch_id"])
        .optional(&["deleted_by_user_id"]);

    /// `status` is `active` or `inactive`, or a boolean.
    branch_set_status => BRANCH_SET_STATUS = Operation::get("branchsetstatus")
        .required(&["branch_id", "status"])
        .flags(&[("status", "active", "inactive")]);

    forgot_username => FORGOT_USERNAME = Operation::get("forgotusername")
        .required(&["email", "domain_url"]);

    forgot_password => FORGOT_PASSWORD = Operation::get("forgotpassword")
        .required(&["username", "domain_url", "redirect_url"]);

    /// Enroll a user; `role` defaults to `learner` on the service side.
    add_user_to_course => ADD_USER_TO_COURSE = Operation::post("addusertocourse")
        .required(&["user_id", "course_id"])
        .optional(&["role"]);

    remove_user_from_course => REMOVE_USER_FROM_COURSE = Operation::get("removeuserfromcourse")
        .required(&["user_id", "course_id"]);

    get_user_status_in_course => GET_USER_STATUS_IN_COURSE = Operation::get("getuserstatusincourse")
        .required(&["user_id", "course_id"]);

    reset_user_progress => RESET_USER_PROGRESS = Operation::get("resetuserprogress")
        .required(&["user_id", "course_id"]);

    add_user_to_branch => ADD_USER_TO_BRANCH = Operation::get("addusertobranch")
        .required(&["user_id", "branch_id"]);

    remove_user_from_branch => REMOVE_USER_FROM_BRANCH = Operation::get("removeuserfrombranch")
        .required(&["user_id", "branch_id"]);

    add_course_to_branch => ADD_COURSE_TO_BRANCH = Operation::get("addcoursetobranch")
        .required(&["course_id", "branch_id"]);

    add_user_to_group => ADD_USER_TO_GROUP = Operation::get("addusertogroup")
        .required(&["user_id", "group_key"]);

    remove_user_from_group => REMOVE_USER_FROM_GROUP = Operation::get("removeuserfromgroup")
        .required(&["user_id", "group_id"]);

    add_course_to_group => ADD_COURSE_TO_GROUP = Operation::get("addcoursetogroup")
        .required(&["course_id", "group_id"]);

    /// Login link that lands the user directly in a course.
    go_to_course => GO_TO_COURSE = Operation::get("gotocourse")
        .required(&["user_id", "course_id"])
        .optional(&["logout_redirect", "course_completed_redirect", "header_hidden_options"])
        .secondary_auth();

    get_users_by_custom_field => GET_USERS_BY_CUSTOM_FIELD = Operation::get("getusersbycustomfield")
        .required(&["custom_field_value"]);

    get_courses_by_custom_field => GET_COURSES_BY_CUSTOM_FIELD = Operation::get("getcoursesbycustomfield")
        .required(&["custom_field_value"]);

    buy_course => BUY_COURSE = Operation::get("buycourse")
        .required(&["user_id", "course_id"])
        .optional(&["coupon"]);

    buy_category_courses => BUY_CATEGORY_COURSES = Operation::get("buycategorycourses")
        .required(&["user_id", "category_id"])
        .optional(&["coupon"]);

    get_custom_registration_fields => GET_CUSTOM_REGISTRATION_FIELDS =
        Operation::get("getcustomregistrationfields");

    get_custom_course_fields => GET_CUSTOM_COURSE_FIELDS = Operation::get("getcustomcoursefields");

    /// Subcategories of a category with their courses and units.
    category_leafs_and_courses => CATEGORY_LEAFS_AND_COURSES = Operation::get("categoryleafsandcourses")
        .required(&["id"]);

    get_users_progress_in_units => GET_USERS_PROGRESS_IN_UNITS = Operation::get("getusersprogressinunits")
        .required(&["unit_id"])
        .optional(&["user_id"]);

    get_test_answers => GET_TEST_ANSWERS = Operation::get("gettestanswers")
        .required(&["test_id", "user_id"]);

    get_survey_answers => GET_SURVEY_ANSWERS = Operation::get("getsurveyanswers")
        .required(&["survey_id", "user_id"]);

    get_ilt_sessions => GET_ILT_SESSIONS = Operation::get("getiltsessions")
        .required(&["ilt_id"]);

    /// Last 200 timeline events of `event_type`. See `timeline::EVENTS`.
    get_timeline => GET_TIMELINE = Operation::get("gettimeline")
        .required(&["event_type"]);

    site_info => SITE_INFO = Operation::get("siteinfo");

    rate_limit => RATE_LIMIT = Operation::get("ratelimit");
}
