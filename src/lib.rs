// Model/controller core for the Qubes configuration tools.
//
// The GUI shells (the new-qube wizard and the global configuration app)
// compose these modules with a widget toolkit through the seams in `view`
// and `admin`; everything here is plain synchronous state that can be
// driven and tested without a display or a running qubesd.

pub mod admin;
pub mod app;
pub mod config;
pub mod model;
pub mod types;
pub mod view;
