//! kubewrap runs the kubectl whose version matches the Kubernetes cluster in
//! the current kubeconfig context, downloading it when it is missing.

pub mod cli;
pub mod config;
pub mod kubectl;
