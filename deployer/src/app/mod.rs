pub mod options;
pub mod outputs;
pub mod run;
