//! Report review workflow: status codec, permission catalogue, validation, upload
//! checks and the transition state machine.
//!
//! Everything in here is synchronous and free of I/O apart from the bounded geotag
//! extraction helper. Storage and notification delivery are supplied by the host.

pub mod attachments;
pub mod events;
pub mod machine;
pub mod permissions;
pub mod status;
pub mod validation;

pub use attachments::{
    check_upload, extract_geotag, extract_geotag_within, validate_file_size, validate_file_type,
    UploadPolicy, UploadRejection,
};
pub use events::{EmitError, NotificationEmitter, ReportEvent};
pub use machine::{
    allowed_targets, request_transition, request_transition_to, required_permission, Actor,
    Transition, TransitionError,
};
pub use permissions::{PermissionRegistry, PermissionSet, Role};
pub use status::{status_equals, to_canonical, to_wire, ReportStatus};
pub use validation::{validate_report_fields, FieldErrors, ValidationOutcome};
