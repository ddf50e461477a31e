//! Timeline event types accepted by `get_timeline`.

/// `(event_type, description)` for every event the service records.
pub const EVENTS: &[(&str, &str)] = &[
    ("user_login_user", "User log in"),
    ("user_register_user", "User registration"),
    ("user_self_register", "User self registration"),
    ("user_delete_user", "User deletion"),
    ("user_undelete_user", "Undelete user"),
    ("user_property_change", "User update"),
    ("user_create_payment", "User payment"),
    ("user_upgrade_level", "User level"),
    ("user_unlock_badge", "User badge"),
    ("course_create_course", "Course creation"),
    ("course_delete_course", "Course deletion"),
    ("course_undelete_course", "Undelete course"),
    ("course_property_change", "Course update"),
    ("course_add_user", "Added user to course"),
    ("course_remove_user", "Removed user from course"),
    ("course_completion", "User completed course"),
    ("course_failure", "User did not pass course"),
    ("course_reset_user_progress", "Reset progress"),
    ("branch_create_branch", "Branch creation"),
    ("branch_delete_branch", "Branch deletion"),
    ("branch_property_change", "Branch update"),
    ("branch_add_user", "Added user to branch"),
    ("branch_remove_user", "Removed user from branch"),
    ("branch_add_course", "Added course to branch"),
    ("branch_remove_course", "Removed course from branch"),
    ("group_create_group", "Group creation"),
    ("group_delete_group", "Group deletion"),
    ("group_property_change", "Group update"),
    ("group_add_user", "Added user to group"),
    ("group_remove_user", "Removed user from group"),
    ("group_add_course", "Added course to group"),
    ("group_remove_course", "Removed course from group"),
    ("certification_issue_certification", "Certification issued to user"),
    ("certification_refresh_certification", "Certification renewed"),
    ("certification_remove_certification", "Certification removed"),
    ("certification_expire_certification", "Certification expired"),
    ("unitprogress_test_completion", "Test completion"),
    ("unitprogress_test_failed", "Test fail"),
    ("unitprogress_survey_completion", "Survey completion"),
    ("unitprogress_assignment_answered", "Assignment submission"),
    ("unitprogress_assignment_graded", "Assignment grading"),
    ("unitprogress_ilt_graded", "ILT grading"),
    ("notification_create_notification", "Notification creation"),
    ("notification_delete_notification", "Notification deletion"),
    ("notification_update_notification", "Notification update"),
    ("automation_create_automation", "Automation creation"),
    ("automation_delete_automation", "Automation deletion"),
    ("automation_update_automation", "Automation update"),
    ("reports_create_custom_report", "Custom report creation"),
    ("reports_delete_custom_report", "Custom report deletion"),
    ("reports_update_custom_report", "Custom report update"),
];

pub fn describe(event_type: &str) -> Option<&'static str> {
    EVENTS
        .iter()
        .find(|(name, _)| *name == event_type)
        .map(|(_, description)| *description)
}
