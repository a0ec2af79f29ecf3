mod notification_repository;
mod report_repository;

pub use notification_repository::NotificationRepository;
pub use report_repository::ReportRepository;
