//! Reconstruction of inlined call frames.
//!
//! The line table only knows the position of the innermost inlined body.
//! Every `DW_TAG_inlined_subroutine` scope around the address records where
//! its caller invoked it, so walking the scopes outward yields one call site
//! per level. Frame `i` pairs the routine active at level `i` with the
//! position inside it, which for `i > 0` is the call site recorded one
//! level further in.

use crate::image::clean_path;
use crate::session::{DebugSession, SourcePosition, UnitHandle};
use crate::{Frame, UNKNOWN};
use log::trace;

/// Builds the frames for `offset` (unbiased, inside `unit`), innermost
/// first. `outer` carries the exported symbol name and the exact line-table
/// position of the address.
pub fn inline_frames<S: DebugSession + ?Sized>(
    session: &S,
    unit: UnitHandle,
    offset: u64,
    outer: Frame,
) -> Vec<Frame> {
    let scopes = session.scopes(unit, offset);
    if scopes.is_empty() {
        return vec![outer];
    }

    let inlined: Vec<(String, SourcePosition)> = scopes
        .into_iter()
        .filter(|&scope| session.tag(scope) == Some(gimli::DW_TAG_inlined_subroutine))
        .map(|scope| {
            let name = session
                .linkage_name(scope)
                .unwrap_or_else(|| UNKNOWN.to_string());
            (name, session.call_site(scope))
        })
        .collect();

    let mut frames = Vec::with_capacity(inlined.len() + 1);
    let mut position = (outer.file.clone(), outer.line, outer.column);
    for (name, call_site) in inlined {
        trace!("inlined {} called from {:?}", name, call_site);
        let (file, line, column) = position;
        frames.push(Frame {
            name,
            file,
            line,
            column,
            is_inlined: true,
        });
        position = (
            call_site
                .file
                .map(|f| clean_path(&f))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            call_site.line,
            call_site.column,
        );
    }

    let (file, line, column) = position;
    frames.push(Frame {
        file,
        line,
        column,
        is_inlined: false,
        ..outer
    });
    frames
}
