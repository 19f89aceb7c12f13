use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum SError {
    #[display("I/O error: {_0}")]
    IOError(String),
    #[display("Parse error: {_0}")]
    ParseError(String),
    #[display("File or directory not found: {_0}")]
    FileOrDirectoryNotFound(String),
    #[display("Mod not found: {_0}")]
    ModNotFound(String),
    #[display("Mod already exists: {_0}")]
    ModExists(String),
    #[display("{_0} is busy")]
    ModBusy(String),
    #[display("{_0} is already mounted")]
    ModAlreadyMounted(String),
    #[display("Already mounted: {_0}")]
    OtherModMounted(String),
    #[display("No mod mounted")]
    NoModMounted,
    #[display("A previous mount was not undone; unmount first")]
    UnfinishedMount,
    #[display("Invalid game folder: {_0}")]
    InvalidGameDirectory(String),
    #[display("Can't delete the mounted mod: {_0}")]
    CantDeleteMounted(String),
    #[display("Missing task input: {_0}")]
    MissingTaskInput(&'static str),
    #[display("Ledger error: {_0}")]
    Ledger(String),
    #[display("A confirmation is already pending")]
    ConfirmationPending,
    #[display("Failed to start worker thread: {_0}")]
    ThreadSpawn(String),
    #[display("Worker thread panicked: {_0}")]
    WorkerPanicked(String),
    #[display("Configuration error: {_0}")]
    Config(String),
}

impl std::error::Error for SError {}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => SError::FileOrDirectoryNotFound(e.to_string()),
            _ => SError::IOError(e.to_string()),
        }
    }
}

impl From<std::path::StripPrefixError> for SError {
    fn from(e: std::path::StripPrefixError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<camino::FromPathBufError> for SError {
    fn from(e: camino::FromPathBufError) -> Self {
        SError::ParseError(format!("Invalid UTF-8 path: {e}"))
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SError {
    fn from(e: zip::result::ZipError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for SError {
    fn from(e: toml::de::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::ser::Error> for SError {
    fn from(e: toml::ser::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}
