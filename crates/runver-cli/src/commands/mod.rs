mod deploy;
mod deploy_pipeline;
mod hooks;

pub use deploy::deploy;
