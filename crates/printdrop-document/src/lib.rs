// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdrop-document: turns uploaded office documents into something the
// print subsystem accepts.  Conversion is delegated to an external tool
// behind the `Converter` capability so the print pipeline can be tested with
// deterministic doubles.

pub mod convert;

pub use convert::{Converter, SofficeConverter};
