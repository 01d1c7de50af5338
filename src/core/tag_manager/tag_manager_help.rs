/// Usage text returned for `op="help"` and for calls without arguments.
pub const HELP: &str = r##"
Help:

google_tag_manager(op="status")
    Show connection status and available operations.

# Account & Container Operations
google_tag_manager(op="listAccounts")
    List all GTM accounts you have access to.

google_tag_manager(op="listContainers", args={"accountId": "123456"})
    List all containers in an account.

google_tag_manager(op="getContainer", args={"accountId": "123456", "containerId": "789"})
    Get container details including container snippet code.

google_tag_manager(op="createContainer", args={
    "accountId": "123456",
    "containerName": "My Website",
    "usageContext": ["web"]  # Options: web, android, ios, amp
})
    Create a new GTM container.

# Tag Operations
google_tag_manager(op="listTags", args={"accountId": "123456", "containerId": "789", "workspaceId": "10"})
    List all tags in a workspace (workspaceId defaults to default workspace).

google_tag_manager(op="createTag", args={
    "accountId": "123456",
    "containerId": "789",
    "workspaceId": "10",
    "tagName": "GA4 Config",
    "tagType": "gaawe",  # Google Analytics: GA4 Event
    "parameters": [
        {"key": "measurementId", "type": "template", "value": "G-XXXXXXXXXX"}
    ],
    "firingTriggerId": ["2147479553"]  # All Pages trigger
})
    Create a new tag.

# Trigger Operations
google_tag_manager(op="listTriggers", args={"accountId": "123456", "containerId": "789", "workspaceId": "10"})
    List all triggers in a workspace.

google_tag_manager(op="createTrigger", args={
    "accountId": "123456",
    "containerId": "789",
    "workspaceId": "10",
    "triggerName": "Form Submit",
    "triggerType": "formSubmission",
    "filters": []
})
    Create a new trigger.

# Variable Operations
google_tag_manager(op="listVariables", args={"accountId": "123456", "containerId": "789", "workspaceId": "10"})
    List all variables in a workspace.

google_tag_manager(op="createVariable", args={
    "accountId": "123456",
    "containerId": "789",
    "workspaceId": "10",
    "variableName": "GA4 Measurement ID",
    "variableType": "c",  # Constant
    "value": "G-XXXXXXXXXX"
})
    Create a new variable.

# Version & Publishing
google_tag_manager(op="createVersion", args={
    "accountId": "123456",
    "containerId": "789",
    "workspaceId": "10",
    "versionName": "Initial Setup",
    "versionNotes": "Setup GA4 tracking"
})
    Create a container version (draft).

google_tag_manager(op="publishVersion", args={
    "accountId": "123456",
    "containerId": "789",
    "versionId": "5"
})
    Publish a container version to production.

# GA4 Integration
google_tag_manager(op="linkGA4", args={
    "accountId": "123456",
    "containerId": "789",
    "workspaceId": "10",
    "measurementId": "G-XXXXXXXXXX"
})
    Create GA4 configuration tag and link it to GTM.

# Common Usage Examples:

# 1. Get container code snippet
google_tag_manager(op="getContainer", args={
    "accountId": "123456",
    "containerId": "789"
})

# 2. Setup GA4 tracking
google_tag_manager(op="linkGA4", args={
    "accountId": "123456",
    "containerId": "789",
    "measurementId": "G-XXXXXXXXXX"
})

# 3. Create custom event tag
google_tag_manager(op="createTag", args={
    "accountId": "123456",
    "containerId": "789",
    "tagName": "Button Click Event",
    "tagType": "gaawe",
    "parameters": [
        {"key": "eventName", "type": "template", "value": "button_click"}
    ],
    "firingTriggerId": ["5"]
})
"##;
