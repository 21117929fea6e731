use std::collections::HashMap;
use std::sync::Arc;

use toolchat_model::ModelTool;

use crate::tool::{AnyTool, Error, Tool, ToolObject};

/// The set of tools a session offers to the model.
///
/// Tools keep the order they were registered in, which is also the order
/// their definitions are sent to the model. Registering a second tool
/// under an existing name replaces the first one in place.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its name.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        let tool: Arc<dyn ToolObject> = Arc::new(AnyTool(tool));
        match self.index.get(&name) {
            Some(&slot) => {
                warn!("tool `{name}` registered twice, keeping the last one");
                self.tools[slot] = tool;
            }
            None => {
                debug!("registered tool `{name}`");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Looks up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ToolObject>, Error> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.tools[slot]))
            .ok_or_else(|| Error::unknown_tool(name))
    }

    /// Returns `true` if a tool with this name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the definitions sent to the model, in registration order.
    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde_json::{Map, Value, json};

    use super::*;
    use crate::tool::{ErrorKind, NoParameters, ToolOutput};

    struct ConstTool {
        name: &'static str,
        output: &'static str,
    }

    impl Tool for ConstTool {
        type Input = NoParameters;

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Returns a constant"
        }

        fn parameter_schema(&self) -> Option<&Value> {
            None
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolOutput> + Send + 'static {
            ready(Ok(json!(self.output)))
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register(ConstTool {
            name: "alpha",
            output: "a",
        });
        registry.register(ConstTool {
            name: "beta",
            output: "b",
        });

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("beta"));
        assert!(!registry.contains("gamma"));
        let tool = registry.lookup("beta").unwrap();
        assert_eq!(tool.execute(Map::new()).await, Ok(json!("b")));

        let err = registry.lookup("gamma").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
        assert!(err.to_string().contains("gamma"));
    }

    #[tokio::test]
    async fn test_last_registration_wins_in_place() {
        let mut registry = Registry::new();
        registry.register(ConstTool {
            name: "alpha",
            output: "old",
        });
        registry.register(ConstTool {
            name: "beta",
            output: "b",
        });
        registry.register(ConstTool {
            name: "alpha",
            output: "new",
        });

        assert_eq!(registry.len(), 2);
        let names: Vec<String> =
            registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["alpha", "beta"]);
        let tool = registry.lookup("alpha").unwrap();
        assert_eq!(tool.execute(Map::new()).await, Ok(json!("new")));
    }
}
