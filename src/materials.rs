//! Material identifiers and the physical categories the passes care about.

/// Air. A voxel holding air is treated exactly like an empty voxel.
pub const AIR: &str = "minecraft:air";
pub const STONE: &str = "minecraft:stone";
pub const PISTON: &str = "minecraft:piston";
pub const STICKY_PISTON: &str = "minecraft:sticky_piston";
pub const SLIME_BLOCK: &str = "minecraft:slime_block";
pub const HONEY_BLOCK: &str = "minecraft:honey_block";
pub const OBSIDIAN: &str = "minecraft:obsidian";
pub const REDSTONE_WIRE: &str = "minecraft:redstone_wire";
pub const REPEATER: &str = "minecraft:repeater";

/// Blocks a piston can never move.
pub const IMMOVABLE: [&str; 6] = [
    "minecraft:obsidian",
    "minecraft:bedrock",
    "minecraft:barrier",
    "minecraft:command_block",
    "minecraft:end_portal_frame",
    "minecraft:spawner",
];

const GLAZED_TERRACOTTA: &str = "glazed_terracotta";

/// Normalizes a material name to the `minecraft:` namespace.
pub fn normalize(material: &str) -> String {
    if material.contains(':') {
        material.to_string()
    } else {
        format!("minecraft:{material}")
    }
}

pub fn is_air(material: &str) -> bool {
    material == AIR
}

pub fn is_piston(material: &str) -> bool {
    material == PISTON || material == STICKY_PISTON
}

pub fn is_immovable(material: &str) -> bool {
    IMMOVABLE.contains(&material)
}

/// Slime and honey drag adjacent blocks along when moved.
pub fn is_sticky(material: &str) -> bool {
    material == SLIME_BLOCK || material == HONEY_BLOCK
}

/// Whether a sticky block `sticky` drags its neighbour `neighbor`.
///
/// Slime and honey never adhere to each other, and glazed terracotta never
/// adheres to anything.
pub fn adheres(sticky: &str, neighbor: &str) -> bool {
    if is_air(neighbor) || neighbor.contains(GLAZED_TERRACOTTA) {
        return false;
    }
    !matches!(
        (sticky, neighbor),
        (SLIME_BLOCK, HONEY_BLOCK) | (HONEY_BLOCK, SLIME_BLOCK)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("stone"), STONE);
        assert_eq!(normalize("minecraft:stone"), STONE);
        assert_eq!(normalize("mod:gear"), "mod:gear");
    }

    #[test]
    fn test_categories() {
        assert!(is_immovable(OBSIDIAN));
        assert!(is_immovable("minecraft:bedrock"));
        assert!(!is_immovable(STONE));
        assert!(is_piston(STICKY_PISTON));
        assert!(is_sticky(HONEY_BLOCK));
        assert!(!is_sticky(STONE));
    }

    #[test]
    fn test_adhesion_rules() {
        assert!(adheres(SLIME_BLOCK, STONE));
        assert!(adheres(SLIME_BLOCK, SLIME_BLOCK));
        assert!(!adheres(SLIME_BLOCK, HONEY_BLOCK));
        assert!(!adheres(HONEY_BLOCK, SLIME_BLOCK));
        assert!(!adheres(SLIME_BLOCK, "minecraft:white_glazed_terracotta"));
        assert!(!adheres(HONEY_BLOCK, AIR));
    }
}
