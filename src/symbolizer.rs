use crate::image::{clean_path, loaded_images, ElfSession};
use crate::inline::inline_frames;
use crate::range::RangeIndexCache;
use crate::session::DebugSession;
use crate::{demangle, Frame, ResolvedLocation, UNKNOWN};
use log::{debug, warn};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// No batch has been reported yet.
    Unreported,
    /// Between `begin_report_elf` and `end_report_elf`.
    Reporting,
    /// Modules are registered and addresses can be resolved.
    Ready,
}

/// Maps runtime instruction addresses to modules, symbols and source
/// positions, including frames for inlined calls.
///
/// A symbolizer is not meant to be shared between threads; callers that
/// need that serialize access themselves.
pub struct Symbolizer<S: DebugSession = ElfSession> {
    session: S,
    range_indexes: RangeIndexCache,
    state: ReportState,
}

impl Symbolizer<ElfSession> {
    pub fn new() -> Self {
        Self::with_session(ElfSession::new())
    }
}

impl Default for Symbolizer<ElfSession> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DebugSession> Symbolizer<S> {
    pub fn with_session(session: S) -> Self {
        Symbolizer {
            session,
            range_indexes: RangeIndexCache::new(),
            state: ReportState::Unreported,
        }
    }

    pub fn state(&self) -> ReportState {
        self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn begin_report_elf(&mut self) {
        if self.state == ReportState::Reporting {
            warn!("restarting an unfinished module report");
        }
        self.session.report_begin();
        self.state = ReportState::Reporting;
    }

    /// Registers the image at `path` loaded at `load_address`. A module that
    /// cannot be registered is logged and left out of later lookups.
    pub fn report_elf<P: AsRef<Path>>(&mut self, path: P, load_address: u64) {
        let path = path.as_ref();
        if self.state != ReportState::Reporting {
            warn!(
                "ignoring {} reported outside of a report batch",
                path.display()
            );
            return;
        }
        match self.session.report_module(path, load_address) {
            Ok(module) => debug!(
                "reported {} at {:#x} as {:?}",
                path.display(),
                load_address,
                module
            ),
            Err(e) => warn!("failed to report {}: {}", path.display(), e),
        }
    }

    pub fn end_report_elf(&mut self) {
        if self.state != ReportState::Reporting {
            warn!("no module report to finish");
            return;
        }
        if let Err(e) = self.session.report_end() {
            warn!("finishing module report: {}", e);
        }
        let session = &self.session;
        self.range_indexes
            .retain(|module| session.module_info(module).is_some());
        self.state = ReportState::Ready;
    }

    /// Reports every image mapped into the current process in one batch.
    pub fn report_current_process(&mut self) {
        self.begin_report_elf();
        for (path, bias) in loaded_images() {
            self.report_elf(path, bias);
        }
        self.end_report_elf();
    }

    pub fn resolve(&mut self, address: u64) -> ResolvedLocation {
        if self.state != ReportState::Ready {
            warn!("resolving {:#x} before modules were reported", address);
            return ResolvedLocation::default();
        }
        let module = match self.session.module_for_address(address) {
            Some(module) => module,
            None => {
                warn!("no module contains {:#x}", address);
                return ResolvedLocation::default();
            }
        };
        let info = match self.session.module_info(module) {
            Some(info) => info,
            None => return ResolvedLocation::default(),
        };

        let (name, symbol_offset) = match self.session.nearest_symbol(module, address) {
            Some(symbol) => (symbol.name, symbol.offset),
            None => (UNKNOWN.to_string(), 0),
        };

        let unit = self
            .session
            .compilation_unit(module, address)
            .or_else(|| self.range_indexes.resolve(&self.session, module, address));

        let frames = match unit {
            Some((unit, bias)) => {
                let offset = address.wrapping_sub(bias);
                let position = self
                    .session
                    .source_position(unit, offset)
                    .unwrap_or_default();
                let outer = Frame {
                    name,
                    file: position
                        .file
                        .map(clean_path)
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                    line: position.line,
                    column: position.column,
                    is_inlined: false,
                };
                inline_frames(&self.session, unit, offset, outer)
            }
            None => {
                debug!("no compilation unit covers {:#x}", address);
                vec![Frame::named(name)]
            }
        };

        ResolvedLocation {
            module_name: info.name,
            module_offset: address.wrapping_sub(info.load_start),
            symbol_offset,
            frames,
        }
    }

    pub fn demangle(&self, name: &str) -> String {
        demangle::demangle(name)
    }
}
