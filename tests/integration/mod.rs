//! Integration tests exercising the monitor core end to end with scripted
//! collaborators.

mod support;

mod lifecycle;
mod orchestration;
