pub mod auth_handle;
pub mod control_handle;
pub mod docs_handle;
pub mod sensor_handle;
pub mod view_handle;

pub use auth_handle::*;
pub use control_handle::*;
pub use docs_handle::*;
pub use sensor_handle::*;
pub use view_handle::*;
