pub mod material;
pub mod movement;

pub use material::Entity as Material;
pub use movement::{Entity as Movement, MovementType};
