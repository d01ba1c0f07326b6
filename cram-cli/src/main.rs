//! `cram`: a functional testing framework for command line applications.

mod args;
mod entry;
mod events;
mod productinfo;

fn main() {
    entry::run();
}
