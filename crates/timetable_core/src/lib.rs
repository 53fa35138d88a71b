pub mod domain;
pub mod ports;
pub mod transfer;

pub use domain::{
    ClassInput, ClassSession, NewTask, ReminderHandle, Slot, Subject, SubjectInput, Task,
    TaskWithSubject, TimetableExport, TimetableImport,
};
pub use ports::{NotificationService, PersistenceService, PortError, PortResult};
pub use transfer::{Chunk, IngestResult, TransferError, TransferResult, TransferSession};
