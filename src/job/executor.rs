//! Scan-job executor.
//!
//! The executor is the print-loop state machine: it owns the scan-engine
//! host, streams a job's scanlines lane by lane, and honors pause and stop
//! requests at well-defined checkpoints. Control advances in explicit
//! [`JobExecutor::tick`] steps; every tick runs to its next checkpoint and
//! suspension happens only between ticks or in the delays a tick performs,
//! so nothing is ever interrupted mid-frame or mid-line.

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::{SystemConfig, LASER_POWER_MAX, LASER_POWER_MIN};
use crate::error::{ConfigError, JobError, Result};
use crate::fpga::{Components, FpgaHost};
use crate::notify::StateSignal;

use super::file::{JobHeader, JobSource};
use super::line::{DirectionHeaders, ScanDirection};
use super::state::MachineState;
use super::Clock;

/// Additional attempts after a failed scanline transmission.
const LINE_SEND_RETRIES: u32 = 3;

/// Wait before a retry, long enough for the engine command buffer to drain.
const RETRY_BACKOFF_MS: u32 = 3000;

/// Poll interval while the job is paused.
const PAUSE_POLL_MS: u32 = 2000;

/// Synchronized-mode dwell after a passed diode test.
const DIODE_STABILITY_MS: u32 = 1000;

/// Executor state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// No job active.
    Idle,
    /// Streaming scanlines.
    Printing,
    /// Suspended by the pause toggle.
    Paused,
    /// Tearing down after an unrecoverable streaming error.
    Aborting,
}

/// Outcome of a checkpoint.
enum Gate {
    Continue,
    Paused,
    Stopped,
}

/// Position inside the print sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Setup,
    LaneStart,
    Facets,
    LaneEnd,
    Finish,
}

/// Per-job streaming context.
struct ActiveRun<S> {
    source: S,
    header: JobHeader,
    headers: DirectionHeaders,
    interval: u32,
    lane: u32,
    facet: u32,
    phase: Phase,
    start_ms: u64,
}

/// The print-loop state machine.
///
/// Owns the scan-engine host, a clock for progress timestamps and a delay
/// provider for its suspension points. The machine state it maintains is
/// published to observers through a [`StateSignal`].
pub struct JobExecutor<H, C, D, S> {
    host: H,
    clock: C,
    delay: D,
    config: SystemConfig,
    state: MachineState,
    exec: ExecState,
    stop: bool,
    signal: StateSignal,
    run: Option<ActiveRun<S>>,
    line_buf: Vec<u8>,
    tx_buf: Vec<u8>,
}

impl<H, C, D, S> JobExecutor<H, C, D, S>
where
    H: FpgaHost,
    C: Clock,
    D: DelayNs,
    S: JobSource,
{
    /// Create an idle executor.
    pub fn new(host: H, clock: C, delay: D, config: SystemConfig) -> Self {
        let state = MachineState::from_defaults(&config.print);
        Self {
            host,
            clock,
            delay,
            config,
            state,
            exec: ExecState::Idle,
            stop: false,
            signal: StateSignal::new(),
            run: None,
            line_buf: Vec::new(),
            tx_buf: Vec::new(),
        }
    }

    /// The observable machine state.
    pub fn machine_state(&self) -> &MachineState {
        &self.state
    }

    /// Current state-machine state.
    pub fn exec_state(&self) -> ExecState {
        self.exec
    }

    /// The state-change signal observers listen on.
    pub fn signal(&self) -> &StateSignal {
        &self.signal
    }

    /// The scan-engine host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the scan-engine host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The active configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Change the default laser power for subsequent jobs.
    ///
    /// # Errors
    ///
    /// Rejects values outside the diode driver's range.
    pub fn set_laser_power(&mut self, power: u8) -> Result<()> {
        if !(LASER_POWER_MIN..=LASER_POWER_MAX).contains(&power) {
            return Err(ConfigError::InvalidLaserPower(power).into());
        }
        self.config.print.laser_power = power;
        Ok(())
    }

    /// Start printing a job.
    ///
    /// Resets the job record from the configured defaults, validates the
    /// header and precomputes the direction headers, then enters
    /// `Printing`. The hardware sequence begins on the first tick.
    ///
    /// # Errors
    ///
    /// [`JobError::Busy`] unless idle; header validation errors surface
    /// immediately and leave the executor idle.
    pub fn start(&mut self, filename: &str, source: S) -> Result<()> {
        if self.exec != ExecState::Idle {
            return Err(JobError::Busy.into());
        }

        let header = source.header();
        header.validate()?;

        self.stop = false;
        self.state.reset(&self.config.print);
        self.state.printing = true;
        self.state.job.filename = heapless::String::try_from(filename).unwrap_or_default();
        self.state.job.total_lines = header.total_lines();

        let exposures = self.state.job.exposures_per_line;
        let single_facet = self.state.job.single_facet;
        info!(
            "printing with laser power {} and {} exposures, {} a single facet",
            self.state.job.laser_power,
            exposures,
            if single_facet { "using" } else { "without" }
        );

        let headers = DirectionHeaders::precompute(&self.config.scanner, exposures);
        let interval = self
            .config
            .scanner
            .checkpoint_interval(exposures, single_facet);

        self.run = Some(ActiveRun {
            source,
            header,
            headers,
            interval,
            lane: 0,
            facet: 0,
            phase: Phase::Setup,
            start_ms: self.clock.now_ms(),
        });
        self.exec = ExecState::Printing;
        self.signal.notify();
        Ok(())
    }

    /// Toggle the pause flag.
    ///
    /// Pausing takes effect at the next checkpoint; toggling again while
    /// paused resumes. Mirrors a physical toggle button.
    pub fn pause(&mut self) {
        if matches!(self.exec, ExecState::Printing | ExecState::Paused) {
            self.state.paused = !self.state.paused;
            debug!(
                "print {}",
                if self.state.paused {
                    "pause requested"
                } else {
                    "resume requested"
                }
            );
        }
    }

    /// Latch a stop request; consumed at the next checkpoint.
    pub fn stop(&mut self) {
        if self.exec != ExecState::Idle {
            debug!("print stop requested");
            self.stop = true;
        }
    }

    /// Advance the state machine to its next checkpoint.
    ///
    /// Returns the state after the tick. Pause and stop requests are only
    /// honored here, never mid-transmission.
    ///
    /// # Errors
    ///
    /// An unrecoverable streaming error aborts the job: the engine is left
    /// desynchronized-off and idle, progress counters are preserved for
    /// diagnostics, and the error is returned.
    pub fn tick(&mut self) -> Result<ExecState> {
        match self.exec {
            ExecState::Idle => Ok(ExecState::Idle),
            ExecState::Paused => {
                if self.stop {
                    self.finish_stopped();
                    return Ok(ExecState::Idle);
                }
                if !self.state.paused {
                    debug!("printing resumed");
                    self.exec = ExecState::Printing;
                    return Ok(ExecState::Printing);
                }
                debug!("printing paused");
                self.delay.delay_ms(PAUSE_POLL_MS);
                Ok(ExecState::Paused)
            }
            ExecState::Printing => self.advance(),
            ExecState::Aborting => {
                self.teardown();
                Ok(self.exec)
            }
        }
    }

    /// Tick until the job ends.
    ///
    /// A paused job keeps polling here until it is resumed or stopped.
    ///
    /// # Errors
    ///
    /// Propagates the aborting error after teardown.
    pub fn run_to_completion(&mut self) -> Result<()> {
        while self.exec != ExecState::Idle {
            self.tick()?;
        }
        Ok(())
    }

    /// Toggle the laser on or off, outside of a job.
    pub fn toggle_laser(&mut self) -> Result<bool> {
        if self.exec != ExecState::Idle {
            return Err(JobError::Busy.into());
        }
        let on = !self.state.components.laser;
        debug!("laser on is {}", on);
        self.enable_comp(Components {
            laser0: on,
            ..Components::default()
        })?;
        self.signal.notify();
        Ok(on)
    }

    /// Toggle the polygon mirror rotation, outside of a job.
    pub fn toggle_prism(&mut self) -> Result<bool> {
        if self.exec != ExecState::Idle {
            return Err(JobError::Busy.into());
        }
        let rotating = !self.state.components.rotating;
        debug!("prism rotation is {}", rotating);
        self.enable_comp(Components {
            polygon: rotating,
            ..Components::default()
        })?;
        self.signal.notify();
        Ok(rotating)
    }

    /// Jog the head by a relative vector in mm, outside of a job.
    pub fn move_by(&mut self, vector: [f32; 3]) -> Result<()> {
        if self.exec != ExecState::Idle {
            return Err(JobError::Busy.into());
        }
        debug!("moving vector {:?}", vector);
        self.host.enable_steppers(true)?;
        self.host.goto_point(vector, false)?;
        self.host.enable_steppers(false)?;
        Ok(())
    }

    /// Run the photodiode self-test.
    ///
    /// Rejects immediately when the trigger flag is already set (a stale
    /// trigger means the last result is meaningless), otherwise runs laser
    /// and mirror for `timeout_s` seconds and records whether the diode saw
    /// light. A passed test is followed by a brief synchronized spin as a
    /// stability check.
    ///
    /// # Errors
    ///
    /// [`JobError::Busy`] while a job is active; host faults propagate.
    pub fn test_diode(&mut self, timeout_s: u32) -> Result<bool> {
        if self.exec != ExecState::Idle {
            return Err(JobError::Busy.into());
        }
        debug!("starting diode test");
        self.state.components.diode_test = None;
        self.signal.notify();

        let flags = self.host.state()?;
        if flags.photodiode_trigger {
            warn!("diode already triggered");
            self.state.components.diode_test = Some(false);
            self.signal.notify();
            return Ok(false);
        }

        self.enable_comp(Components {
            laser1: true,
            polygon: true,
            ..Components::default()
        })?;
        debug!("waiting {} s for diode trigger", timeout_s);
        self.delay.delay_ms(timeout_s.saturating_mul(1000));
        self.enable_comp(Components::default())?;

        let flags = self.host.state()?;
        let passed = flags.photodiode_trigger;
        self.state.components.diode_test = Some(passed);

        if passed {
            debug!("diode test passed");
            let single_facet = self.state.job.single_facet;
            self.enable_comp(Components {
                synchronize: true,
                single_facet,
                ..Components::default()
            })?;
            self.delay.delay_ms(DIODE_STABILITY_MS);
            self.enable_comp(Components::default())?;
        } else {
            warn!("diode not triggered");
        }

        self.signal.notify();
        Ok(passed)
    }

    /// Switch engine components and mirror the flags into the observable
    /// component state.
    fn enable_comp(&mut self, components: Components) -> Result<()> {
        self.state.components.laser = components.laser0 || components.laser1;
        self.state.components.rotating = components.polygon;
        self.host.enable_comp(components)
    }

    fn advance(&mut self) -> Result<ExecState> {
        match self.advance_inner() {
            Ok(next) => Ok(next),
            Err(e) => {
                error!("print aborted: {}", e);
                self.exec = ExecState::Aborting;
                self.teardown();
                Err(e)
            }
        }
    }

    fn advance_inner(&mut self) -> Result<ExecState> {
        let Some(phase) = self.run.as_ref().map(|run| run.phase) else {
            self.exec = ExecState::Idle;
            return Ok(ExecState::Idle);
        };
        match phase {
            Phase::Setup => self.step_setup(),
            Phase::LaneStart => self.step_lane_start(),
            Phase::Facets => self.step_facets(),
            Phase::LaneEnd => self.step_lane_end(),
            Phase::Finish => self.step_finish(),
        }
    }

    /// Bring the hardware into scanning shape: steppers, laser current,
    /// homing, start position and synchronized mode.
    fn step_setup(&mut self) -> Result<ExecState> {
        let single_facet = self.state.job.single_facet;

        self.host.enable_steppers(true)?;

        let power = self.state.job.laser_power;
        if (LASER_POWER_MIN..=LASER_POWER_MAX).contains(&power) {
            self.host.set_laser_current(power)?;
        }

        // z is not homed: it is already positioned so the laser is in focus
        info!("homing x and y axes");
        self.host.home_axes([true, true, false])?;

        // the x offset keeps the scan area clear of the home switch
        info!("moving to scan start position");
        self.host
            .goto_point(self.config.scanner.start_offset, false)?;

        self.enable_comp(Components {
            synchronize: true,
            single_facet,
            ..Components::default()
        })?;

        if let Some(run) = self.run.as_mut() {
            run.phase = Phase::LaneStart;
        }
        Ok(ExecState::Printing)
    }

    fn step_lane_start(&mut self) -> Result<ExecState> {
        match self.gate() {
            Gate::Stopped => {
                self.finish_stopped();
                return Ok(ExecState::Idle);
            }
            Gate::Paused => return Ok(ExecState::Paused),
            Gate::Continue => {}
        }

        let Some((lane, lanes, facets_per_lane, lane_width)) = self.run.as_ref().map(|run| {
            (
                run.lane,
                run.header.lane_count,
                run.header.facets_per_lane,
                run.header.lane_width,
            )
        }) else {
            self.exec = ExecState::Idle;
            return Ok(ExecState::Idle);
        };

        if lane >= lanes {
            if let Some(run) = self.run.as_mut() {
                run.phase = Phase::Finish;
            }
            return Ok(ExecState::Printing);
        }

        self.state.job.current_line = lane * facets_per_lane;
        self.touch_time();
        self.signal.notify();

        info!("exposing lane {} of {}", lane + 1, lanes);
        if lane > 0 {
            info!("moving in x direction for next lane");
            self.host.goto_point([lane_width, 0.0, 0.0], false)?;
        }
        match ScanDirection::for_lane(lane) {
            ScanDirection::Forward => info!("start exposing forward lane"),
            ScanDirection::Backward => info!("start exposing back lane"),
        }

        if let Some(run) = self.run.as_mut() {
            run.facet = 0;
            run.phase = Phase::Facets;
        }
        Ok(ExecState::Printing)
    }

    /// Stream scanlines up to the next checkpoint boundary.
    fn step_facets(&mut self) -> Result<ExecState> {
        let Some((lane, facet, facets_per_lane, interval)) = self.run.as_ref().map(|run| {
            (
                run.lane,
                run.facet,
                run.header.facets_per_lane,
                run.interval,
            )
        }) else {
            self.exec = ExecState::Idle;
            return Ok(ExecState::Idle);
        };

        if facet % interval == 0 {
            self.state.job.current_line = lane * facets_per_lane + facet;
            self.touch_time();
            self.signal.notify();
            match self.gate() {
                Gate::Stopped => {
                    self.finish_stopped();
                    return Ok(ExecState::Idle);
                }
                Gate::Paused => return Ok(ExecState::Paused),
                Gate::Continue => {}
            }
        }

        let chunk_end = (facet - facet % interval + interval).min(facets_per_lane);
        let exposures = usize::from(self.state.job.exposures_per_line.max(1));
        let single_facet = self.state.job.single_facet;
        let line_bytes = self.config.scanner.line_bytes();
        let direction = ScanDirection::for_lane(lane);

        let mut current = facet;
        while current < chunk_end {
            if let Some(run) = self.run.as_mut() {
                self.line_buf.resize(line_bytes, 0);
                run.source.read_line(&mut self.line_buf)?;
                run.headers.patch(&mut self.line_buf, direction);
            }

            self.tx_buf.clear();
            for _ in 0..exposures {
                self.tx_buf.extend_from_slice(&self.line_buf);
            }
            self.send_line(single_facet)?;

            current += 1;
            if let Some(run) = self.run.as_mut() {
                run.facet = current;
            }
        }

        if current >= facets_per_lane {
            if let Some(run) = self.run.as_mut() {
                run.phase = Phase::LaneEnd;
            }
        }
        Ok(ExecState::Printing)
    }

    fn step_lane_end(&mut self) -> Result<ExecState> {
        // lane-terminating empty line
        self.host.write_line(&[])?;
        if let Some(run) = self.run.as_mut() {
            run.lane += 1;
            run.phase = Phase::LaneStart;
        }
        Ok(ExecState::Printing)
    }

    fn step_finish(&mut self) -> Result<ExecState> {
        self.signal.notify();
        info!("waiting for stop line to execute");
        self.enable_comp(Components::default())?;
        self.host.enable_steppers(false)?;

        match self.host.state() {
            Ok(flags) if flags.error => warn!("scan engine flagged an error during print"),
            Ok(_) => {}
            Err(_) => warn!("scan engine state unreadable after print"),
        }

        self.touch_time();
        info!(
            "finished exposure, total printing time {} s",
            self.state.job.printing_time_s
        );
        self.state.printing = false;
        self.run = None;
        self.exec = ExecState::Idle;
        self.signal.notify();
        Ok(ExecState::Idle)
    }

    /// Transmit the prepared line, with bounded retry.
    ///
    /// Each failed attempt waits out the engine buffer, resets the link and
    /// re-enables synchronized mode before trying again. Exhausting the
    /// budget resets the link a final time and surfaces the error, which
    /// aborts the whole job rather than silently skipping the line.
    fn send_line(&mut self, single_facet: bool) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            match self.host.send_command(&self.tx_buf) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt > LINE_SEND_RETRIES {
                        warn!("scanline dropped after {} attempts", attempt);
                        let _ = self.host.reset();
                        return Err(e);
                    }
                    warn!(
                        "scanline rejected, resetting scan-engine link (attempt {})",
                        attempt
                    );
                    self.delay.delay_ms(RETRY_BACKOFF_MS);
                    let _ = self.host.reset();
                    let _ = self.host.enable_comp(Components {
                        synchronize: true,
                        single_facet,
                        ..Components::default()
                    });
                }
            }
        }
    }

    /// Checkpoint: latched stop wins, then the pause toggle.
    fn gate(&mut self) -> Gate {
        if self.stop {
            return Gate::Stopped;
        }
        if self.state.paused {
            debug!("printing paused");
            self.exec = ExecState::Paused;
            return Gate::Paused;
        }
        Gate::Continue
    }

    fn finish_stopped(&mut self) {
        debug!("print stopped");
        self.teardown();
    }

    /// Leave the hardware disarmed and the executor idle. Progress counters
    /// stay as they were for diagnostics.
    fn teardown(&mut self) {
        let _ = self.host.enable_comp(Components::default());
        let _ = self.host.enable_steppers(false);
        self.state.components.laser = false;
        self.state.components.rotating = false;
        self.state.printing = false;
        self.state.paused = false;
        self.stop = false;
        self.run = None;
        self.exec = ExecState::Idle;
        self.signal.notify();
    }

    fn touch_time(&mut self) {
        let now = self.clock.now_ms();
        if let Some(run) = self.run.as_ref() {
            self.state.job.printing_time_s =
                ((now.saturating_sub(run.start_ms) + 500) / 1000) as u32;
        }
    }
}
