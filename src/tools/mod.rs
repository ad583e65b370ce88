pub mod calculator;
pub mod code_helper;
pub mod dictionary;
pub mod executor;
pub mod image;
pub mod registry;
pub mod translator;
pub mod weather;

pub use calculator::CalculatorTool;
pub use code_helper::CodeHelperTool;
pub use dictionary::DictionaryTool;
pub use executor::ToolExecutor;
pub use image::ImageTool;
pub use registry::{Tool, ToolInfo, ToolOutcome, ToolRegistry};
pub use translator::TranslatorTool;
pub use weather::WeatherTool;
