pub(crate) mod behaviours;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
