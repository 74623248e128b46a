/// Decomposition guidelines shared by the generation prompt and the MCP instructions.
pub const GUIDELINES: &str = "\
1. Group by business capability. A microservice owns one coherent area of the business \
(e.g. \"Sales\", \"Inventory\", \"Identity\"), not a technical layer such as \"Database\" or \"API\".\n\
2. Every data model belongs to exactly one microservice. Do not list the same data model under \
two microservices; pick the service whose capability the data model is most central to.\n\
3. Use only the data models you were given. Do not invent, rename, merge or split data models. \
Copy each name exactly as it appears in the input, including letter case.\n\
4. Follow the references. A field whose type is the name of another data model is a reference \
to it. Data models that reference each other heavily usually belong together; a single reference \
across a boundary is acceptable.\n\
5. Keep identity and access together. User, role and credential data models form their own \
service unless the monolith is too small to justify one.\n\
6. Prefer fewer, meaningful services. A microservice with a single trivial data model is usually \
a sign it should be folded into its closest neighbour.\n\
7. Name services by what they do. Names are short nouns in PascalCase (\"OrderManagement\"), \
and `functionality` is one sentence describing the capability, not a list of data models.";
