mod settings;

pub use settings::{
    DirectoryConfig, MailConfig, NatsConfig, OtelConfig, ProcessorConfig, ServerConfig, Settings,
};
