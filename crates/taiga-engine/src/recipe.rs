//! Crafting recipes.
//!
//! A recipe consumes fixed ingredient quantities from a player's inventory
//! and produces one unit of its result.

use serde::{Deserialize, Serialize};

use crate::item::ItemKind::{self, *};
use crate::item::ItemStack;
use crate::player::Player;

/// Stable recipe identifier used by the session layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipe {
    pub id: RecipeId,
    pub result: ItemKind,
    pub ingredients: &'static [(ItemKind, u32)],
}

pub const RECIPES: &[Recipe] = &[
    Recipe {
        id: RecipeId(1),
        result: StoneAxe,
        ingredients: &[(SharpRock, 1), (DownyBirchBranches, 2), (GoatWillowStalks, 1)],
    },
    Recipe {
        id: RecipeId(2),
        result: Cordage,
        ingredients: &[(GoatWillowStalks, 3)],
    },
    Recipe {
        id: RecipeId(3),
        result: BerryMash,
        ingredients: &[(Cloudberries, 5), (BirdCherries, 2)],
    },
];

impl Recipe {
    pub fn find(id: RecipeId) -> Option<&'static Recipe> {
        RECIPES.iter().find(|r| r.id == id)
    }

    /// `"Sharp Rock x 1, Goat Willow Stalks x 1"`.
    pub fn description(&self) -> String {
        self.ingredients
            .iter()
            .map(|&(kind, n)| format!("{} x {n}", kind.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn can_make(&self, player: &Player) -> bool {
        self.ingredients
            .iter()
            .all(|&(kind, n)| player.count(kind) >= n)
    }

    /// Consume the ingredients and add the result. Returns false, changing
    /// nothing, when an ingredient is short.
    pub fn make(&self, player: &mut Player) -> bool {
        if !self.can_make(player) {
            return false;
        }
        for &(kind, n) in self.ingredients {
            player.remove_items(kind, n);
        }
        player.add_items(ItemStack::new(self.result, 1));
        true
    }
}

/// Recipes `player` can make right now.
pub fn available(player: &Player) -> Vec<&'static Recipe> {
    RECIPES.iter().filter(|r| r.can_make(player)).collect()
}
