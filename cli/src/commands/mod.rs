mod helpers;
mod plan;
mod recipe;

use weekplate_core::service::Planner;
use weekplate_core::store::KvStore;

/// Planner over whichever store the global flags selected.
pub(crate) type AppPlanner = Planner<Box<dyn KvStore>>;

pub(crate) use plan::{
    cmd_plan_clear, cmd_plan_generate, cmd_plan_mark, cmd_plan_reroll, cmd_plan_show,
};
pub(crate) use recipe::{
    cmd_recipe_add, cmd_recipe_delete, cmd_recipe_export, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show,
};
