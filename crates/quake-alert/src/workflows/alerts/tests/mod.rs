mod common;
mod impact;
mod orchestrator;
