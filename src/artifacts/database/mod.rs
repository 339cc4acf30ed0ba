//! Types handed out when reading trees back from the object database.

pub mod database_entry;
