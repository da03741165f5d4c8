//! Tag QA engine: browser drivers, the test run and everything written to disk.
#[cfg(feature = "browser")]
mod chrome_driver;
mod driver;
mod engine;
mod explore;
mod http_driver;
mod log_export;
mod naming;
mod page;
mod persist;
mod report_render;
mod run;
mod session_file;
mod types;
mod workspace;

#[cfg(feature = "browser")]
pub use chrome_driver::ChromeDriver;
pub use driver::{BrowserDriver, ResponseSink};
pub use engine::{ChannelRunHost, EngineConfig, EngineHandle};
pub use http_driver::{DriverSettings, HttpDriver};
pub use log_export::{export_log, render_csv, ExportError};
pub use naming::{capture_filename, short_hash, timestamped_filename};
pub use page::{resolve_href, scan_page, PageScan, Subresource};
pub use persist::{ensure_output_dir, ArtifactWriter, PersistError};
pub use report_render::{MarkdownReportRenderer, RenderedReport, ReportError, ReportRenderer};
pub use run::{ResponseRecorder, RunController, RunHost, RunSettings};
pub use session_file::{
    decode_session, encode_session, load_session, save_session, SessionContents,
    SessionFileError,
};
pub use types::{
    BrowserMode, ClickOptions, DriverBackend, DriverError, EngineEvent, InteractiveElement,
    RunError, RunEvent, RunSummary, SessionId, SweepSummary, TabId, TabInfo, UrlOutcome,
    UrlResult,
};
pub use workspace::{Workspace, WorkspaceError, ROOT_DIR_NAME};
