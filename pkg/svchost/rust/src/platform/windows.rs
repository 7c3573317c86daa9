// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Service Control Manager integration.

use crate::config::Config;
use crate::context::RunContext;
use crate::control::{self, ControlRequest, ServiceHost};
use crate::error::{Error, Result};
use crate::registry::{RegisteredService, ServiceRegistry};
use crate::state::{ServiceState, Status};
use log::{debug, error, info, warn};
use std::ffi::{OsStr, OsString};
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use windows_service::service::{
    Service, ServiceAccess, ServiceAction, ServiceActionType, ServiceControl,
    ServiceControlAccept, ServiceDependency, ServiceErrorControl, ServiceExitCode,
    ServiceFailureActions, ServiceFailureResetPeriod, ServiceInfo, ServiceStartType,
    ServiceState as ScmState, ServiceStatus, ServiceType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};
use windows_service::{define_windows_service, service_dispatcher};
use windows_sys::Win32::Security::{
    AllocateAndInitializeSid, CheckTokenMembership, FreeSid, SID_IDENTIFIER_AUTHORITY,
};
use windows_sys::Win32::System::Registry::{HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RegGetValueW};

const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

const SECURITY_NT_AUTHORITY: SID_IDENTIFIER_AUTHORITY = SID_IDENTIFIER_AUTHORITY {
    Value: [0, 0, 0, 0, 0, 5],
};
const SECURITY_INTERACTIVE_RID: u32 = 4;
const SECURITY_SERVICE_RID: u32 = 6;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

/// Whether the process token carries the well-known NT AUTHORITY group `rid`.
fn token_has_group(rid: u32) -> std::io::Result<bool> {
    let mut sid = std::ptr::null_mut();
    // SAFETY: the authority outlives the call and `sid` is a valid out pointer.
    let ok = unsafe {
        AllocateAndInitializeSid(&SECURITY_NT_AUTHORITY, 1, rid, 0, 0, 0, 0, 0, 0, 0, &mut sid)
    };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut is_member = 0;
    // SAFETY: a null token checks the calling thread's token; `sid` was just allocated.
    let ok = unsafe { CheckTokenMembership(std::ptr::null_mut(), sid, &mut is_member) };
    let result = if ok == 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(is_member != 0)
    };
    // SAFETY: `sid` came from AllocateAndInitializeSid and is freed exactly once.
    unsafe { FreeSid(sid) };
    result
}

pub(crate) fn detect_interactive() -> bool {
    let detected = token_has_group(SECURITY_SERVICE_RID).and_then(|service| {
        if service {
            Ok(false)
        } else {
            token_has_group(SECURITY_INTERACTIVE_RID)
        }
    });
    detected.unwrap_or_else(|e| {
        warn!("could not tell how the process was launched, assuming interactive: {e}");
        true
    })
}

pub(crate) fn read_wait_to_kill() -> Option<String> {
    let subkey = wide(r"SYSTEM\CurrentControlSet\Control");
    let value = wide("WaitToKillServiceTimeout");
    let mut buf = [0u16; 64];
    let mut size = std::mem::size_of_val(&buf) as u32;
    // SAFETY: both names are NUL terminated and `size` is the byte length of `buf`.
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            subkey.as_ptr(),
            value.as_ptr(),
            RRF_RT_REG_SZ,
            std::ptr::null_mut(),
            buf.as_mut_ptr().cast(),
            &mut size,
        )
    };
    if status != 0 {
        debug!("WaitToKillServiceTimeout not readable (error {status})");
        return None;
    }
    let len = (size as usize / 2).min(buf.len());
    buf.get(..len).map(String::from_utf16_lossy)
}

// ---------------------------------------------------------------------------
// Hosting under the SCM
// ---------------------------------------------------------------------------

// The dispatcher calls a plain function, so the run context is parked here.
static HOSTED: OnceLock<Arc<RunContext>> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

/// Connect to the SCM and block until the service stopped.
pub(crate) fn run_service(ctx: Arc<RunContext>) -> Result<()> {
    let name = ctx.name().to_string();
    HOSTED.set(ctx).map_err(|_| Error::AlreadyRunning)?;
    service_dispatcher::start(&name, ffi_service_main).map_err(Error::registry)
}

fn service_main(arguments: Vec<OsString>) {
    let Some(ctx) = HOSTED.get().cloned() else {
        error!("service dispatcher started without a run context");
        return;
    };
    if let Err(e) = host_service(&ctx, arguments) {
        error!("[{}] service host failed: {e:#}", ctx.name());
    }
}

fn forward(
    requests: &UnboundedSender<ControlRequest>,
    request: ControlRequest,
) -> ServiceControlHandlerResult {
    if requests.send(request).is_err() {
        debug!("dropping {request:?}, control loop already finished");
    }
    ServiceControlHandlerResult::NoError
}

fn host_service(ctx: &Arc<RunContext>, arguments: Vec<OsString>) -> anyhow::Result<()> {
    debug!("[{}] launched by the SCM with {} argument(s)", ctx.name(), arguments.len());

    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |control| match control {
        ServiceControl::Stop => forward(&tx, ControlRequest::Stop),
        ServiceControl::Shutdown => forward(&tx, ControlRequest::Shutdown),
        ServiceControl::Interrogate => forward(&tx, ControlRequest::Interrogate),
        _ => ServiceControlHandlerResult::NotImplemented,
    };
    let status_handle = service_control_handler::register(ctx.name(), handler)?;
    let host = ScmHost {
        name: ctx.name().to_string(),
        status_handle,
        wait_hint: ctx.stop_timeout(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let exit = runtime.block_on(control::execute(ctx, &host, rx));
    // Abandoned stop routines must not hold the process.
    runtime.shutdown_background();
    info!("[{}] service exited with {exit:?}", ctx.name());
    Ok(())
}

struct ScmHost {
    name: String,
    status_handle: ServiceStatusHandle,
    wait_hint: Duration,
}

impl ScmHost {
    fn scm_status(&self, status: Status) -> ServiceStatus {
        let (current_state, wait_hint) = match status.state {
            ServiceState::StartPending => (ScmState::StartPending, self.wait_hint),
            ServiceState::Running => (ScmState::Running, Duration::ZERO),
            ServiceState::StopPending => (ScmState::StopPending, self.wait_hint),
            ServiceState::Stopped => (ScmState::Stopped, Duration::ZERO),
        };
        ServiceStatus {
            service_type: ServiceType::OWN_PROCESS,
            current_state,
            controls_accepted: if status.accepts_stop {
                ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN
            } else {
                ServiceControlAccept::empty()
            },
            exit_code: if status.exit.service_specific {
                ServiceExitCode::ServiceSpecific(status.exit.code)
            } else {
                ServiceExitCode::Win32(status.exit.code)
            },
            checkpoint: 0,
            wait_hint,
            process_id: None,
        }
    }
}

impl ServiceHost for ScmHost {
    fn set_status(&self, status: Status) -> anyhow::Result<()> {
        self.status_handle.set_service_status(self.scm_status(status))?;
        Ok(())
    }

    fn interrogate(&self, current: Status) -> anyhow::Result<()> {
        self.set_status(current)
    }

    fn request_stop(&self) -> anyhow::Result<()> {
        let manager = ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)?;
        let service = manager.open_service(&self.name, ServiceAccess::STOP)?;
        service.stop()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRegistry;

pub struct ScmService {
    service: Service,
}

fn from_scm(state: ScmState) -> ServiceState {
    match state {
        ScmState::StartPending => ServiceState::StartPending,
        ScmState::StopPending => ServiceState::StopPending,
        ScmState::Stopped => ServiceState::Stopped,
        ScmState::Running
        | ScmState::ContinuePending
        | ScmState::PausePending
        | ScmState::Paused => ServiceState::Running,
    }
}

fn connect(access: ServiceManagerAccess) -> Result<ServiceManager> {
    ServiceManager::local_computer(None::<&str>, access).map_err(Error::registry)
}

impl RegisteredService for ScmService {
    fn start(&self) -> Result<()> {
        self.service.start::<&OsStr>(&[]).map_err(Error::registry)
    }

    fn stop(&self) -> Result<ServiceState> {
        let status = self.service.stop().map_err(Error::registry)?;
        Ok(from_scm(status.current_state))
    }

    fn query(&self) -> Result<ServiceState> {
        let status = self.service.query_status().map_err(Error::registry)?;
        Ok(from_scm(status.current_state))
    }

    fn set_restart_on_failure(&self, delay: Duration) -> Result<()> {
        let actions = ServiceFailureActions {
            reset_period: ServiceFailureResetPeriod::After(Duration::ZERO),
            reboot_msg: None,
            command: None,
            actions: Some(vec![ServiceAction {
                action_type: ServiceActionType::Restart,
                delay,
            }]),
        };
        self.service
            .update_failure_actions(actions)
            .map_err(Error::registry)?;
        self.service
            .set_failure_actions_on_non_crash_failures(true)
            .map_err(Error::registry)
    }

    fn delete(self) -> Result<()> {
        self.service.delete().map_err(Error::registry)
    }
}

impl ServiceRegistry for SystemRegistry {
    type Service = ScmService;

    fn open(&self, name: &str) -> Result<Option<ScmService>> {
        let manager = connect(ServiceManagerAccess::CONNECT)?;
        let access = ServiceAccess::QUERY_STATUS
            | ServiceAccess::START
            | ServiceAccess::STOP
            | ServiceAccess::DELETE
            | ServiceAccess::CHANGE_CONFIG;
        match manager.open_service(name, access) {
            Ok(service) => Ok(Some(ScmService { service })),
            Err(windows_service::Error::Winapi(e))
                if e.raw_os_error() == Some(ERROR_SERVICE_DOES_NOT_EXIST) =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::registry(e)),
        }
    }

    fn create(&self, config: &Config, executable: &Path) -> Result<ScmService> {
        let manager =
            connect(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;
        let display_name = if config.display_name.is_empty() {
            &config.name
        } else {
            &config.display_name
        };
        let info = ServiceInfo {
            name: OsString::from(&config.name),
            display_name: OsString::from(display_name),
            service_type: ServiceType::OWN_PROCESS,
            start_type: ServiceStartType::AutoStart,
            error_control: ServiceErrorControl::Normal,
            executable_path: executable.to_path_buf(),
            launch_arguments: config.arguments.iter().map(OsString::from).collect(),
            dependencies: config
                .dependencies
                .iter()
                .map(|d| ServiceDependency::Service(OsString::from(d)))
                .collect(),
            account_name: config.username.as_ref().map(OsString::from),
            account_password: config.password.as_ref().map(OsString::from),
        };
        let access = ServiceAccess::QUERY_STATUS
            | ServiceAccess::START
            | ServiceAccess::STOP
            | ServiceAccess::DELETE
            | ServiceAccess::CHANGE_CONFIG;
        let service = manager
            .create_service(&info, access)
            .map_err(Error::registry)?;
        if !config.description.is_empty() {
            service
                .set_description(&config.description)
                .map_err(Error::registry)?;
        }
        Ok(ScmService { service })
    }
}
