//! End-to-end scenarios through the public API: AI proposals, the patch
//! pipeline, and the confirmation gate against real files.

mod scenarios;
