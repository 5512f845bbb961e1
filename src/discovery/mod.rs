//! Discovery poller: on-startup and periodic scan of every cluster.
//!
//! For every configured cluster, fetches the build listing and records:
//! - The cluster's current builds (replacing the previous list)
//! - An operator alert when the cluster cannot be reached

pub mod poller;
