//! User-invocable run/debug commands.
//!
//! Four thin entry points, each turning a document (and optionally a testcase
//! name) into a [`DebugLaunchRequest`] and delegating to the debug launcher.
//! The document must have an owning workspace folder; invoking a command on a
//! loose file is an explicit error.

use std::sync::Arc;

use url::Url;

use crate::debug::{DebugLaunchRequest, DebugLauncher, DebugSession};
use crate::error::LauncherError;
use crate::host::{DelegatedCommands, WorkspaceLayout};

/// The four commands contributed to the host's command palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotCommand {
    RunTestsuite,
    DebugTestsuite,
    RunTestcase,
    DebugTestcase,
}

impl RobotCommand {
    pub const ALL: [RobotCommand; 4] = [
        RobotCommand::RunTestsuite,
        RobotCommand::DebugTestsuite,
        RobotCommand::RunTestcase,
        RobotCommand::DebugTestcase,
    ];

    /// Identifier the host registers the command under.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::RunTestsuite => "robot.runTestsuite",
            Self::DebugTestsuite => "robot.debugTestsuite",
            Self::RunTestcase => "robot.runTestcase",
            Self::DebugTestcase => "robot.debugTestcase",
        }
    }
}

/// Command registrar bound to one activation's debug launcher.
pub struct CommandSet {
    launcher: Arc<DebugLauncher>,
    workspace: Arc<dyn WorkspaceLayout>,
    delegated: Option<Arc<dyn DelegatedCommands>>,
}

impl CommandSet {
    #[must_use]
    pub fn new(
        launcher: Arc<DebugLauncher>,
        workspace: Arc<dyn WorkspaceLayout>,
        delegated: Option<Arc<dyn DelegatedCommands>>,
    ) -> Self {
        Self {
            launcher,
            workspace,
            delegated,
        }
    }

    /// Run a whole suite without debugging.
    pub async fn run_testsuite(&self, document: Url) -> Result<DebugSession, LauncherError> {
        self.dispatch(DebugLaunchRequest::suite(document, true)).await
    }

    /// Debug a whole suite.
    pub async fn debug_testsuite(&self, document: Url) -> Result<DebugSession, LauncherError> {
        self.dispatch(DebugLaunchRequest::suite(document, false))
            .await
    }

    /// Run a single testcase without debugging.
    pub async fn run_testcase(
        &self,
        document: Url,
        testcase: String,
    ) -> Result<DebugSession, LauncherError> {
        self.dispatch(DebugLaunchRequest::testcase(document, testcase, true))
            .await
    }

    /// Debug a single testcase.
    pub async fn debug_testcase(
        &self,
        document: Url,
        testcase: String,
    ) -> Result<DebugSession, LauncherError> {
        self.dispatch(DebugLaunchRequest::testcase(document, testcase, false))
            .await
    }

    async fn dispatch(&self, request: DebugLaunchRequest) -> Result<DebugSession, LauncherError> {
        let folder = self
            .workspace
            .folder_of(&request.document)
            .ok_or_else(|| LauncherError::NoWorkspaceFolder(request.document.clone()))?;
        self.launcher
            .launch(&request, &folder, self.delegated.as_deref())
            .await
    }
}
