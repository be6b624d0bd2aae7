pub mod job_runner;
pub mod pass_writer;

pub use job_runner::{JobReport, JobRunner};
pub use pass_writer::{
    read_pass_dump, DumpHeader, PassDump, PassDumpWriter, PassLog, PassSummary, Tee, DUMP_MAGIC,
};
