pub mod node;
pub mod radio;
pub mod relay;
pub mod sensor;

pub use node::{MeshNode, MeshNodeConfig};
pub use radio::{Radio, RadioError, RadioEvent, RxStatus};
pub use relay::{DropReason, FloodRelay, RelayDecision};
pub use sensor::{SensorError, SensorProbe, SensorReading};
